//! Markdown summary report across all levels.
//!
//! Part one lists each level's ranking with 🟢/🔴 markers and a short
//! statistics block. Part two compares each level against the newest
//! artifact older than the trend window and lists large percentile moves.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use sw_common::OutputConfig;

use crate::data::IndustryLevel;
use crate::valuation::{IndexValuation, LevelStats, ValuationBand};

use super::artifact::{find_baseline, latest_file, read_results};
use super::{format_opt, format_pct};

// ============================================================================
// Options
// ============================================================================

/// Report settings.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// History span shown in the header
    pub history_years: u32,
    /// Minimum age in days of the trend baseline
    pub trend_days: u32,
    /// Minimum absolute percentile change listed as a trend
    pub trend_threshold: f64,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            history_years: 30,
            trend_days: 7,
            trend_threshold: 10.0,
        }
    }
}

impl From<&OutputConfig> for ReportOptions {
    fn from(config: &OutputConfig) -> Self {
        Self {
            history_years: config.history_years,
            trend_days: config.trend_days,
            trend_threshold: config.trend_threshold,
        }
    }
}

impl ReportOptions {
    /// Baseline artifacts must be modified before this instant.
    pub fn trend_cutoff(&self, now: SystemTime) -> SystemTime {
        let window = std::time::Duration::from_secs(u64::from(self.trend_days) * 86_400);
        now.checked_sub(window).unwrap_or(SystemTime::UNIX_EPOCH)
    }

    fn window_label(&self) -> String {
        if self.trend_days == 7 {
            "七日".to_string()
        } else {
            format!("{}日", self.trend_days)
        }
    }
}

// ============================================================================
// Trend Detection
// ============================================================================

/// Valuation multiple compared in the trend section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Pe,
    Pb,
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pe => "PE",
            Self::Pb => "PB",
        }
    }

    fn percentile(&self, v: &IndexValuation) -> Option<f64> {
        match self {
            Self::Pe => v.pe_percentile,
            Self::Pb => v.pb_percentile,
        }
    }
}

/// One index whose percentile moved by at least the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendChange {
    pub level: IndustryLevel,
    pub index_name: String,
    pub current: f64,
    pub previous: f64,
    /// `current - previous`, in percentile points
    pub change: f64,
}

/// Join `current` and `baseline` by index name and keep moves of at least
/// `threshold` points. Rows missing either percentile are ignored.
pub fn trend_changes(
    metric: Metric,
    level: IndustryLevel,
    current: &[IndexValuation],
    baseline: &[IndexValuation],
    threshold: f64,
) -> Vec<TrendChange> {
    let mut previous_by_name: HashMap<&str, f64> = HashMap::new();
    for row in baseline {
        if let Some(p) = metric.percentile(row) {
            previous_by_name.entry(row.index_name.as_str()).or_insert(p);
        }
    }

    current
        .iter()
        .filter_map(|row| {
            let current = metric.percentile(row)?;
            let previous = *previous_by_name.get(row.index_name.as_str())?;
            let change = current - previous;
            (change.abs() >= threshold).then(|| TrendChange {
                level,
                index_name: row.index_name.clone(),
                current,
                previous,
                change,
            })
        })
        .collect()
}

// ============================================================================
// Level Section
// ============================================================================

/// Current and baseline results of one level.
#[derive(Debug, Clone)]
pub struct LevelSection {
    pub level: IndustryLevel,
    /// `None` renders as "no data"
    pub current: Option<Vec<IndexValuation>>,
    /// Newest artifact older than the trend window, if any
    pub baseline: Option<Vec<IndexValuation>>,
}

impl LevelSection {
    pub fn new(
        level: IndustryLevel,
        current: Option<Vec<IndexValuation>>,
        baseline: Option<Vec<IndexValuation>>,
    ) -> Self {
        Self {
            level,
            current,
            baseline,
        }
    }

    /// Pair freshly computed results with the baseline artifact in `dir`.
    pub fn from_run(
        dir: &Path,
        level: IndustryLevel,
        current: Option<Vec<IndexValuation>>,
        cutoff: SystemTime,
    ) -> Result<Self> {
        let baseline = match find_baseline(dir, level, cutoff)? {
            Some(path) => Some(
                read_results(&path)
                    .with_context(|| format!("Failed to read baseline {}", path.display()))?,
            ),
            None => None,
        };
        Ok(Self::new(level, current, baseline))
    }

    /// Load the newest artifact of `level` and its baseline from `dir`.
    pub fn from_artifacts(dir: &Path, level: IndustryLevel, cutoff: SystemTime) -> Result<Self> {
        let Some(latest) = latest_file(dir, level)? else {
            return Ok(Self::new(level, None, None));
        };

        let current = read_results(&latest)
            .with_context(|| format!("Failed to read {}", latest.display()))?;

        let baseline = match find_baseline(dir, level, cutoff)? {
            Some(path) if path != latest => Some(
                read_results(&path)
                    .with_context(|| format!("Failed to read baseline {}", path.display()))?,
            ),
            _ => None,
        };

        Ok(Self::new(level, Some(current), baseline))
    }

    fn trend(&self, metric: Metric, threshold: f64) -> Vec<TrendChange> {
        match (&self.current, &self.baseline) {
            (Some(current), Some(baseline)) => {
                trend_changes(metric, self.level, current, baseline, threshold)
            }
            _ => Vec::new(),
        }
    }
}

// ============================================================================
// Summary Report
// ============================================================================

/// File name of the report generated on `date`.
pub fn report_file_name(date: NaiveDate) -> String {
    format!("valuation_report_{}.md", date.format("%Y%m%d"))
}

/// Markdown report over all levels.
pub struct SummaryReport {
    options: ReportOptions,
    generated_at: NaiveDateTime,
    sections: Vec<LevelSection>,
}

impl SummaryReport {
    pub fn new(
        options: ReportOptions,
        generated_at: NaiveDateTime,
        sections: Vec<LevelSection>,
    ) -> Self {
        Self {
            options,
            generated_at,
            sections,
        }
    }

    /// Write the report into `dir` and return its path.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir).context("Failed to create report directory")?;

        let path = dir.join(report_file_name(self.generated_at.date()));
        std::fs::write(&path, self.to_markdown()).context("Failed to write report file")?;

        Ok(path)
    }

    /// Generate the Markdown text.
    pub fn to_markdown(&self) -> String {
        let timestamp = self.generated_at.format("%Y-%m-%d %H:%M:%S").to_string();
        let mut md = String::new();

        // Header
        md.push_str("# 申万行业估值分析报告\n\n");
        md.push_str(&format!("**生成时间**: {}\n\n", timestamp));
        md.push_str("**数据来源**: Tushare sw_daily 接口\n\n");
        md.push_str(&format!("**历史跨度**: {}年\n\n", self.options.history_years));
        md.push_str("---\n\n");

        // Part one
        md.push_str("## 第一部分：本日估值概览\n\n");
        for section in &self.sections {
            self.write_level(&mut md, section);
        }

        // Part two
        let window = self.options.window_label();
        md.push_str("---\n\n");
        md.push_str(&format!("## 第二部分：{}趋势变化\n\n", window));
        for metric in [Metric::Pe, Metric::Pb] {
            self.write_trend(&mut md, metric, &window);
        }

        // Reminders
        md.push_str("### ⚠️ 特别提醒\n\n");
        md.push_str("- 🟢 表示低估（百分位 ≤ 20%），可能存在投资机会\n");
        md.push_str("- 🔴 表示高估（百分位 ≥ 80%），需要注意风险\n");
        md.push_str("- 估值判断需结合行业特性，成长性行业可能长期维持较高估值\n");
        md.push_str(&format!(
            "- 百分位变化超过 {}% 需要特别关注\n\n",
            self.options.trend_threshold
        ));

        // Footer
        md.push_str("---\n\n");
        md.push_str(&format!("*报告生成时间: {}*\n", timestamp));

        md
    }

    fn write_level(&self, md: &mut String, section: &LevelSection) {
        let name = section.level.display_name();
        let results = match &section.current {
            Some(results) if !results.is_empty() => results,
            _ => {
                md.push_str(&format!("### {} - 无数据\n\n", name));
                return;
            }
        };

        md.push_str(&format!("### {}\n\n", name));
        md.push_str("| 排名 | 行业代码 | 行业名称 | PE | PE百分位 | PB | PB百分位 | 数据点 | 最新日期 |\n");
        md.push_str("|------|----------|----------|----|---------|----|---------|-------|---------|\n");

        for (i, r) in results.iter().enumerate() {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {}{} | {} | {}{} | {} | {} |\n",
                i + 1,
                r.index_code,
                r.index_name,
                format_opt(r.pe, 2),
                format_pct(r.pe_percentile),
                band_suffix(r.pe_band()),
                format_opt(r.pb, 2),
                format_pct(r.pb_percentile),
                band_suffix(r.pb_band()),
                r.sample_count,
                r.latest_date
                    .map(|d| d.format("%Y%m%d").to_string())
                    .unwrap_or_else(|| "N/A".to_string()),
            ));
        }

        let stats = LevelStats::compute(section.level, results);
        md.push_str(&format!("\n**{}汇总**：\n\n", name));
        md.push_str(&format!("- 低估行业（PE ≤ 20%）：{} 个\n", stats.pe_undervalued));
        md.push_str(&format!("- 高估行业（PE ≥ 80%）：{} 个\n", stats.pe_overvalued));
        md.push_str(&format!("- 低估行业（PB ≤ 20%）：{} 个\n", stats.pb_undervalued));
        md.push_str(&format!("- 高估行业（PB ≥ 80%）：{} 个\n", stats.pb_overvalued));
        md.push_str(&format!("- PE 百分位中位数：{}\n", format_pct(stats.pe_median)));
        md.push_str(&format!("- PB 百分位中位数：{}\n\n", format_pct(stats.pb_median)));
    }

    fn write_trend(&self, md: &mut String, metric: Metric, window: &str) {
        let threshold = self.options.trend_threshold;

        md.push_str(&format!(
            "### {} 百分位变化（超过 {}%）\n\n",
            metric.label(),
            threshold
        ));
        md.push_str(&format!(
            "| 行业级别 | 行业名称 | 当前百分位 | {}前百分位 | 变化 |\n",
            window
        ));
        md.push_str("|----------|----------|-----------|------------|------|\n");

        let changes: Vec<TrendChange> = self
            .sections
            .iter()
            .flat_map(|s| s.trend(metric, threshold))
            .collect();

        if changes.is_empty() {
            md.push_str("| - | 无显著变化 | - | - | - |\n");
        }
        for c in &changes {
            let arrow = if c.change > 0.0 { "📈" } else { "📉" };
            md.push_str(&format!(
                "| {} | {} | {:.1}% | {:.1}% | {} {:+.1}% |\n",
                c.level.display_name(),
                c.index_name,
                c.current,
                c.previous,
                arrow,
                c.change
            ));
        }
        md.push('\n');
    }
}

fn band_suffix(band: Option<ValuationBand>) -> String {
    match band.map(|b| b.marker()) {
        Some(marker) if !marker.is_empty() => format!(" {}", marker),
        _ => String::new(),
    }
}

// ============================================================================
// Tests
// ============================================================================
