//! Output rendering: CSV artifacts, console ranking and the Markdown summary.

pub mod artifact;
pub mod console;
pub mod summary;

pub use artifact::{
    artifact_file_name, find_baseline, latest_file, list_artifacts, read_results, write_results,
    ARTIFACT_PREFIX,
};
pub use console::render_ranking;
pub use summary::{
    report_file_name, trend_changes, LevelSection, Metric, ReportOptions, SummaryReport,
    TrendChange,
};

/// Format an optional value with fixed decimals, `N/A` when missing.
pub fn format_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "N/A".to_string(),
    }
}

/// Format an optional percentile as `12.3%`, `N/A` when missing.
pub fn format_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_opt() {
        assert_eq!(format_opt(Some(12.346), 2), "12.35");
        assert_eq!(format_opt(Some(7.0), 2), "7.00");
        assert_eq!(format_opt(None, 2), "N/A");
    }

    #[test]
    fn test_format_pct() {
        assert_eq!(format_pct(Some(12.36)), "12.4%");
        assert_eq!(format_pct(Some(100.0)), "100.0%");
        assert_eq!(format_pct(None), "N/A");
    }
}
