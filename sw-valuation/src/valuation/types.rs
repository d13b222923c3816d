//! Valuation result types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::data::IndustryLevel;

/// Percentile at or below which a multiple counts as cheap.
pub const UNDERVALUED_PERCENTILE: f64 = 20.0;

/// Percentile at or above which a multiple counts as expensive.
pub const OVERVALUED_PERCENTILE: f64 = 80.0;

// ============================================================================
// Valuation Band
// ============================================================================

/// Position of a percentile in the historical distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValuationBand {
    /// At or below the 20th percentile (低估)
    Undervalued,
    /// Between the 20th and 80th percentile (中性)
    Neutral,
    /// At or above the 80th percentile (高估)
    Overvalued,
}

impl ValuationBand {
    /// Band for a percentile.
    pub fn from_percentile(percentile: f64) -> Self {
        if percentile <= UNDERVALUED_PERCENTILE {
            Self::Undervalued
        } else if percentile >= OVERVALUED_PERCENTILE {
            Self::Overvalued
        } else {
            Self::Neutral
        }
    }

    /// Report marker for the band (empty for neutral).
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Undervalued => "🟢",
            Self::Neutral => "",
            Self::Overvalued => "🔴",
        }
    }
}

impl std::fmt::Display for ValuationBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undervalued => write!(f, "低估"),
            Self::Neutral => write!(f, "中性"),
            Self::Overvalued => write!(f, "高估"),
        }
    }
}

// ============================================================================
// Index Valuation
// ============================================================================

/// Current valuation of one index against its own history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexValuation {
    /// Index code
    pub index_code: String,
    /// Index name
    pub index_name: String,
    /// Latest PE, rounded to 2 dp
    pub pe: Option<f64>,
    /// Percentile of the latest PE (0-100)
    pub pe_percentile: Option<f64>,
    /// Latest PB, rounded to 2 dp
    pub pb: Option<f64>,
    /// Percentile of the latest PB (0-100)
    pub pb_percentile: Option<f64>,
    /// Rows the percentiles were computed over
    pub sample_count: usize,
    /// Trade date of the latest row
    pub latest_date: Option<NaiveDate>,
}

impl IndexValuation {
    pub fn pe_band(&self) -> Option<ValuationBand> {
        self.pe_percentile.map(ValuationBand::from_percentile)
    }

    pub fn pb_band(&self) -> Option<ValuationBand> {
        self.pb_percentile.map(ValuationBand::from_percentile)
    }
}

/// Order two optional percentiles ascending with missing values last.
pub fn cmp_percentile(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort results by PE percentile ascending, missing last. Stable.
pub fn sort_by_pe_percentile(results: &mut [IndexValuation]) {
    results.sort_by(|a, b| cmp_percentile(a.pe_percentile, b.pe_percentile));
}

// ============================================================================
// Level Statistics
// ============================================================================

/// Aggregate view over one level's results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelStats {
    pub level: IndustryLevel,
    pub count: usize,
    /// Indices with PE percentile ≤ 20
    pub pe_undervalued: usize,
    /// Indices with PE percentile ≥ 80
    pub pe_overvalued: usize,
    /// Indices with PB percentile ≤ 20
    pub pb_undervalued: usize,
    /// Indices with PB percentile ≥ 80
    pub pb_overvalued: usize,
    pub pe_median: Option<f64>,
    pub pb_median: Option<f64>,
}

impl LevelStats {
    pub fn compute(level: IndustryLevel, results: &[IndexValuation]) -> Self {
        let pe: Vec<f64> = results.iter().filter_map(|r| r.pe_percentile).collect();
        let pb: Vec<f64> = results.iter().filter_map(|r| r.pb_percentile).collect();

        let count_band = |values: &[f64], band: ValuationBand| {
            values
                .iter()
                .filter(|v| ValuationBand::from_percentile(**v) == band)
                .count()
        };

        Self {
            level,
            count: results.len(),
            pe_undervalued: count_band(&pe, ValuationBand::Undervalued),
            pe_overvalued: count_band(&pe, ValuationBand::Overvalued),
            pb_undervalued: count_band(&pb, ValuationBand::Undervalued),
            pb_overvalued: count_band(&pb, ValuationBand::Overvalued),
            pe_median: median(&pe),
            pb_median: median(&pb),
        }
    }
}

/// Median of a slice; mean of the two middle values for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

// ============================================================================
// Tests
// ============================================================================
