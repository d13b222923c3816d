//! Daily job: cleanup, all three levels, summary report.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

use sw_common::Config;

use crate::data::{DateRange, IndustryLevel};
use crate::housekeeping::cleanup_old_files;
use crate::report::{write_results, LevelSection, ReportOptions, SummaryReport};
use crate::runner::{RunSummary, ValuationRunner};

/// Settings for one daily job.
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub output_dir: PathBuf,
    /// Artifacts older than this many days are deleted first
    pub cleanup_days: u32,
    pub history_years: u32,
    pub report: ReportOptions,
}

impl JobOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_dir: config.output.dir_path(),
            cleanup_days: config.output.cleanup_days,
            history_years: config.output.history_years,
            report: ReportOptions::from(&config.output),
        }
    }
}

/// What a daily job produced.
#[derive(Debug)]
pub struct JobOutcome {
    /// Stale artifacts removed before the run
    pub deleted: Vec<PathBuf>,
    /// Per-level summaries; failed levels are absent
    pub summaries: Vec<RunSummary>,
    /// CSV artifact written per level with data
    pub artifacts: Vec<(IndustryLevel, PathBuf)>,
    pub report_path: PathBuf,
}

/// Run every level in order and write the summary report.
///
/// A level that fails, or yields no results, renders as "no data" in the
/// report; the job itself only fails on local I/O errors.
pub async fn run_daily(
    runner: &mut ValuationRunner,
    options: &JobOptions,
    today: NaiveDate,
) -> Result<JobOutcome> {
    let dir = options.output_dir.as_path();
    let cutoff = options.report.trend_cutoff(SystemTime::now());

    info!(days = options.cleanup_days, dir = %dir.display(), "Step 1: cleaning up old artifacts");
    let deleted = cleanup_old_files(dir, options.cleanup_days)
        .with_context(|| format!("Failed to clean up {}", dir.display()))?;

    info!("Step 2: analyzing industry valuations");
    let range = DateRange::years_back(today, options.history_years);
    let mut summaries = Vec::new();
    let mut artifacts = Vec::new();
    let mut sections = Vec::new();

    for level in IndustryLevel::ALL {
        let current = match runner.run(level, range).await {
            Ok(summary) if summary.results.is_empty() => {
                warn!(level = %level, "No valid results");
                summaries.push(summary);
                None
            }
            Ok(summary) => {
                let path = write_results(dir, level, &summary.results, Local::now().naive_local())
                    .with_context(|| format!("Failed to write {} artifact", level))?;
                info!(level = %level, path = %path.display(), "Level analysis complete");
                artifacts.push((level, path));
                let results = summary.results.clone();
                summaries.push(summary);
                Some(results)
            }
            Err(e) => {
                warn!(level = %level, error = %e, "Level analysis failed");
                None
            }
        };

        sections.push(LevelSection::from_run(dir, level, current, cutoff)?);
    }

    info!("Step 3: generating summary report");
    let report = SummaryReport::new(options.report.clone(), Local::now().naive_local(), sections);
    let report_path = report.save(dir)?;
    info!(path = %report_path.display(), "Summary report written");

    Ok(JobOutcome {
        deleted,
        summaries,
        artifacts,
        report_path,
    })
}

/// Rebuild the summary report from the newest artifact of each level.
pub fn regenerate_report(dir: &Path, options: &ReportOptions) -> Result<PathBuf> {
    let cutoff = options.trend_cutoff(SystemTime::now());

    let sections = IndustryLevel::ALL
        .into_iter()
        .map(|level| LevelSection::from_artifacts(dir, level, cutoff))
        .collect::<Result<Vec<_>>>()?;

    let report = SummaryReport::new(options.clone(), Local::now().naive_local(), sections);
    report.save(dir)
}
