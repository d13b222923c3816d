//! Index valuation analyzer.
//!
//! Turns one index's daily history into its current PE/PB percentiles.

use crate::data::{DailyValuation, IndustryIndex};

use super::percentile::{percentile_rank, round2};
use super::types::IndexValuation;

/// Analyzer configuration.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerConfig {
    /// Keep every `interval`-th trading day, newest first. 0 keeps all rows.
    pub interval: usize,
}

/// Percentile analyzer for a single index.
#[derive(Debug, Clone, Default)]
pub struct ValuationAnalyzer {
    config: AnalyzerConfig,
}

impl ValuationAnalyzer {
    /// Create an analyzer that uses every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an analyzer with a sampling interval.
    pub fn with_interval(interval: usize) -> Self {
        Self {
            config: AnalyzerConfig { interval },
        }
    }

    /// Rank the newest row of `history` against the (sampled) history.
    ///
    /// Returns `None` for an empty history.
    pub fn analyze(
        &self,
        index: &IndustryIndex,
        mut history: Vec<DailyValuation>,
    ) -> Option<IndexValuation> {
        if history.is_empty() {
            return None;
        }

        history.sort_by(|a, b| b.trade_date.cmp(&a.trade_date));
        let sampled = self.sample(history);

        let latest = sampled.first()?;
        let pe_history: Vec<Option<f64>> = sampled.iter().map(|d| d.pe).collect();
        let pb_history: Vec<Option<f64>> = sampled.iter().map(|d| d.pb).collect();

        Some(IndexValuation {
            index_code: index.ts_code.clone(),
            index_name: index.name.clone(),
            pe: latest.pe.map(round2),
            pe_percentile: percentile_rank(&pe_history, latest.pe),
            pb: latest.pb.map(round2),
            pb_percentile: percentile_rank(&pb_history, latest.pb),
            sample_count: sampled.len(),
            latest_date: Some(latest.trade_date),
        })
    }

    /// Keep every `interval`-th row starting at the newest.
    fn sample(&self, history: Vec<DailyValuation>) -> Vec<DailyValuation> {
        match self.config.interval {
            0 | 1 => history,
            step => history.into_iter().step_by(step).collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::IndustryLevel;
    use chrono::NaiveDate;

    fn index() -> IndustryIndex {
        IndustryIndex {
            ts_code: "801780.SI".into(),
            name: "申万银行".into(),
            level: IndustryLevel::L1,
        }
    }

    fn day(offset: u32, pe: Option<f64>, pb: Option<f64>) -> DailyValuation {
        DailyValuation {
            ts_code: "801780.SI".into(),
            trade_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                + chrono::Duration::days(i64::from(offset)),
            pe,
            pb,
        }
    }

    #[test]
    fn test_empty_history() {
        assert!(ValuationAnalyzer::new().analyze(&index(), vec![]).is_none());
    }

    #[test]
    fn test_latest_is_newest_date_regardless_of_order() {
        let history = vec![
            day(0, Some(10.0), Some(1.0)),
            day(3, Some(20.0), Some(2.0)),
            day(1, Some(30.0), Some(3.0)),
            day(2, Some(20.0), Some(4.0)),
        ];

        let result = ValuationAnalyzer::new().analyze(&index(), history).unwrap();
        assert_eq!(result.latest_date, NaiveDate::from_ymd_opt(2024, 1, 4));
        assert_eq!(result.pe, Some(20.0));
        // [10, 20, 20, 30] → (1 + 1) / 4
        assert_eq!(result.pe_percentile, Some(50.0));
        // 2.0 vs [1, 2, 3, 4] → (1 + 0.5) / 4
        assert_eq!(result.pb_percentile, Some(37.5));
        assert_eq!(result.sample_count, 4);
        assert_eq!(result.index_name, "申万银行");
    }

    #[test]
    fn test_missing_latest_pe() {
        let history = vec![day(0, Some(10.0), Some(1.0)), day(1, None, Some(2.0))];

        let result = ValuationAnalyzer::new().analyze(&index(), history).unwrap();
        assert_eq!(result.pe, None);
        assert_eq!(result.pe_percentile, None);
        assert_eq!(result.pb_percentile, Some(75.0));
    }

    #[test]
    fn test_values_rounded() {
        let history = vec![day(0, Some(12.3456), Some(1.005_1))];
        let result = ValuationAnalyzer::new().analyze(&index(), history).unwrap();
        assert_eq!(result.pe, Some(12.35));
        assert_eq!(result.pb, Some(1.01));
        assert_eq!(result.pe_percentile, Some(50.0));
    }

    #[test]
    fn test_interval_sampling_starts_at_newest() {
        // 10 days, PE equal to the day offset
        let history: Vec<_> = (0..10).map(|i| day(i, Some(i as f64), None)).collect();

        let result = ValuationAnalyzer::with_interval(3)
            .analyze(&index(), history)
            .unwrap();

        // Kept offsets: 9, 6, 3, 0
        assert_eq!(result.sample_count, 4);
        assert_eq!(result.pe, Some(9.0));
        // 9 is the strict maximum of 4 → 3.5 / 4
        assert_eq!(result.pe_percentile, Some(87.5));
        assert_eq!(result.pb_percentile, None);
    }

    #[test]
    fn test_interval_one_keeps_everything() {
        let history: Vec<_> = (0..5).map(|i| day(i, Some(1.0), None)).collect();
        let result = ValuationAnalyzer::with_interval(1)
            .analyze(&index(), history)
            .unwrap();
        assert_eq!(result.sample_count, 5);
    }
}
