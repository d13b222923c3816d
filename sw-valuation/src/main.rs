//! SW Valuation - Historical PE/PB percentiles for Shenwan industry indices.
//!
//! Fetches daily valuation data from Tushare Pro, ranks each industry's
//! current multiples against its own history and writes CSV and Markdown
//! reports.

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use sw_common::logging::init_logging;
use sw_common::{Config, Error, Validate};
use sw_valuation::data::{DateRange, IndustryLevel, RateLimitedClient, TushareAdapter};
use sw_valuation::housekeeping::cleanup_old_files;
use sw_valuation::job::{regenerate_report, run_daily, JobOptions};
use sw_valuation::report::{render_ranking, write_results, ReportOptions};
use sw_valuation::runner::ValuationRunner;
use sw_valuation::valuation::ValuationAnalyzer;

/// Shenwan industry valuation percentile analysis.
#[derive(Parser, Debug)]
#[command(name = "sw-valuation")]
#[command(version)]
#[command(about = "申万行业指数市盈率市净率历史百分位分析", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Config file (default: ~/.sw-valuation/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Tushare token (overrides config and TUSHARE_TOKEN)
    #[arg(short, long, global = true)]
    token: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze one industry level and write its CSV
    Analyze {
        /// Industry level (L1, L2, L3)
        #[arg(short, long, default_value = "L1")]
        level: IndustryLevel,

        /// Years of history
        #[arg(short, long, default_value = "1")]
        years: u32,

        /// Keep every N-th trading day (0 = all)
        #[arg(short, long, default_value = "0")]
        interval: usize,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Daily job: cleanup, all levels, summary report
    Run {
        /// Output directory (default: output.dir from config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Delete artifacts older than this many days
        #[arg(short, long)]
        cleanup_days: Option<u32>,

        /// Years of history
        #[arg(short, long)]
        years: Option<u32>,
    },

    /// Regenerate the summary report from existing artifacts
    Report {
        /// Output directory (default: output.dir from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete stale CSV artifacts
    Cleanup {
        /// Delete artifacts older than this many days
        #[arg(short, long)]
        days: Option<u32>,

        /// Output directory (default: output.dir from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            let code = e.downcast_ref::<Error>().map_or(1, Error::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.global)?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );
    info!("SW Valuation v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Analyze {
            level,
            years,
            interval,
            output,
        } => analyze(&config, level, years, interval, output).await,

        Commands::Run {
            output,
            cleanup_days,
            years,
        } => {
            let mut options = JobOptions::from_config(&config);
            if let Some(dir) = output {
                options.output_dir = dir;
            }
            if let Some(days) = cleanup_days {
                options.cleanup_days = days;
            }
            if let Some(years) = years {
                options.history_years = years;
                options.report.history_years = years;
            }
            daily(&config, options).await
        }

        Commands::Report { output } => {
            let dir = output.unwrap_or_else(|| config.output.dir_path());
            let path = regenerate_report(&dir, &ReportOptions::from(&config.output))?;
            println!("✅ 汇总报告已生成: {}", path.display());
            Ok(())
        }

        Commands::Cleanup { days, output } => {
            let dir = output.unwrap_or_else(|| config.output.dir_path());
            let days = days.unwrap_or(config.output.cleanup_days);
            let deleted = cleanup_old_files(&dir, days)
                .with_context(|| format!("Failed to clean up {}", dir.display()))?;
            print_cleanup(&deleted, days);
            Ok(())
        }
    }
}

/// Load config, apply environment and flag overrides, validate.
fn load_config(args: &GlobalArgs) -> Result<Config> {
    let mut config = Config::load_with_env(args.config.as_deref())?;

    if let Some(token) = &args.token {
        config.tushare.token = Some(token.clone());
    }
    if let Some(level) = &args.log_level {
        config.observability.log_level = level.clone();
    }
    if let Some(format) = &args.log_format {
        config.observability.log_format = format.clone();
    }

    config
        .validate()
        .map_err(|e| Error::Config(e.to_string()))?;
    Ok(config)
}

fn build_runner(config: &Config, interval: usize) -> Result<ValuationRunner> {
    let adapter = TushareAdapter::from_config(config)?;
    let client = RateLimitedClient::from_config("tushare", &config.fetch);

    Ok(ValuationRunner::new(Arc::new(adapter), client)
        .with_analyzer(ValuationAnalyzer::with_interval(interval)))
}

async fn analyze(
    config: &Config,
    level: IndustryLevel,
    years: u32,
    interval: usize,
    output: PathBuf,
) -> Result<()> {
    let mut runner = build_runner(config, interval)?;

    println!("{}", "=".repeat(70));
    println!("申万行业指数市盈率市净率历史百分位分析 - sw_daily版");
    println!("{}", "=".repeat(70));
    println!();
    println!("📊 使用接口: sw_daily (直接获取官方PE/PB数据)");
    println!();
    println!("📅 分析时间范围: 最近 {} 年", years);
    println!("📊 行业级别: {}", level.display_name());
    if interval > 0 {
        println!("📊 采样间隔: 每{}天", interval);
    } else {
        println!("📊 采样间隔: 使用全部交易日数据");
    }
    println!();

    let range = DateRange::years_back(Local::now().date_naive(), years);
    let summary = runner.run(level, range).await?;

    println!();
    print!("{}", render_ranking(level, &summary.results));
    if summary.results.is_empty() {
        return Ok(());
    }

    let path = write_results(&output, level, &summary.results, Local::now().naive_local())?;
    println!("\n✅ 结果已保存至: {}", path.display());

    println!("\n📊 统计信息:");
    println!("   - API总调用次数: {}", runner.total_requests());
    println!("   - 行业数量: {}", summary.results.len());
    println!("   - 分析起始日期: {}", summary.range.start_param());
    println!("   - 分析结束日期: {}", summary.range.end_param());
    if !summary.skipped.is_empty() {
        println!("   - 无数据行业: {}", summary.skipped.join(", "));
    }

    Ok(())
}

async fn daily(config: &Config, options: JobOptions) -> Result<()> {
    let mut runner = build_runner(config, 0)?;

    let outcome = run_daily(&mut runner, &options, Local::now().date_naive()).await?;

    print_cleanup(&outcome.deleted, options.cleanup_days);
    for summary in &outcome.summaries {
        print!("{}", render_ranking(summary.level, &summary.results));
    }
    for (level, path) in &outcome.artifacts {
        println!("✅ {} 分析完成: {}", level, path.display());
    }

    println!("\n{}", "=".repeat(70));
    println!("✅ 汇总报告已生成: {}", outcome.report_path.display());
    println!("   - API总调用次数: {}", runner.total_requests());
    println!("{}", "=".repeat(70));

    Ok(())
}

fn print_cleanup(deleted: &[PathBuf], days: u32) {
    for path in deleted {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        println!("🗑️  删除旧文件: {}", name);
    }

    if deleted.is_empty() {
        println!("ℹ️  没有超过 {} 天的旧文件需要清理", days);
    } else {
        println!("✅ 已清理 {} 个超过 {} 天的旧文件", deleted.len(), days);
    }
}
