//! Valuation Module.
//!
//! Ranks an index's current PE and PB against its own history.
//!
//! # Percentile Convention
//!
//! Values below the current one count fully, equal values count half:
//!
//! ```text
//! percentile = (count_below + 0.5 × count_equal) / n × 100
//! ```
//!
//! So a flat history ranks at exactly 50, and the strict minimum of `n`
//! values ranks at `50 / n` rather than 0.
//!
//! # Usage
//!
//! ```ignore
//! use sw_valuation::valuation::ValuationAnalyzer;
//!
//! let analyzer = ValuationAnalyzer::with_interval(0);
//! if let Some(result) = analyzer.analyze(&index, history) {
//!     println!("{} PE percentile: {:?}", result.index_name, result.pe_percentile);
//! }
//! ```

pub mod analyzer;
pub mod percentile;
pub mod types;

pub use analyzer::{AnalyzerConfig, ValuationAnalyzer};
pub use percentile::{percentile_rank, round2};
pub use types::{
    cmp_percentile, median, sort_by_pe_percentile, IndexValuation, LevelStats, ValuationBand,
    OVERVALUED_PERCENTILE, UNDERVALUED_PERCENTILE,
};
