//! Market data layer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  ValuationRunner                     │
//! │                        │                             │
//! │              RateLimitedClient (pacing + retry)      │
//! │                        │                             │
//! │           ValuationSource (trait)                    │
//! │                        │                             │
//! │               TushareAdapter (HTTP)                  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! The runner never talks HTTP directly: every upstream call goes through
//! the rate-limited client, which turns exhausted retries into `None`.

pub mod classify;
pub mod provider;
pub mod rate_limiter;
pub mod tushare;

pub use classify::{classify, SW_MARKET};
pub use provider::{is_rate_limit_message, ProviderError, ValuationSource, RATE_LIMIT_PATTERNS};
pub use rate_limiter::{RateLimitedClient, RetryPolicy};
pub use tushare::TushareAdapter;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Industry Level
// ============================================================================

/// Shenwan industry classification tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndustryLevel {
    /// 一级行业
    L1,
    /// 二级行业
    L2,
    /// 三级行业
    L3,
}

impl IndustryLevel {
    /// All tiers, in report order.
    pub const ALL: [IndustryLevel; 3] = [Self::L1, Self::L2, Self::L3];

    /// Short code used in file names and on the command line.
    pub fn code(&self) -> &'static str {
        match self {
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L3 => "L3",
        }
    }

    /// Chinese display name used in console output and reports.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::L1 => "一级行业",
            Self::L2 => "二级行业",
            Self::L3 => "三级行业",
        }
    }
}

impl fmt::Display for IndustryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for IndustryLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "L1" | "1" => Ok(Self::L1),
            "L2" | "2" => Ok(Self::L2),
            "L3" | "3" => Ok(Self::L3),
            _ => Err(format!("Unknown industry level: {} (expected L1, L2 or L3)", s)),
        }
    }
}

// ============================================================================
// Upstream Records
// ============================================================================

/// One row of the upstream index listing, before classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexBasic {
    /// Index code (e.g., "801010.SI")
    pub ts_code: String,
    /// Index name (e.g., "申万农林牧渔")
    pub name: String,
    /// Market code reported by upstream
    pub market: Option<String>,
    /// Index category reported by upstream
    pub category: Option<String>,
}

/// A classified industry index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndustryIndex {
    /// Index code, unique within a run
    pub ts_code: String,
    /// Display name
    pub name: String,
    /// Classification tier
    pub level: IndustryLevel,
}

/// One trading day of valuation multiples for an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyValuation {
    /// Index code
    pub ts_code: String,
    /// Trade date
    pub trade_date: NaiveDate,
    /// Price-to-earnings ratio
    pub pe: Option<f64>,
    /// Price-to-book ratio
    pub pb: Option<f64>,
}

/// Inclusive date range for history requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Range ending at `end` and reaching back `years × 365` days.
    pub fn years_back(end: NaiveDate, years: u32) -> Self {
        let start = end - chrono::Duration::days(i64::from(years) * 365);
        Self { start, end }
    }

    /// Upstream wire format (`YYYYMMDD`) for the start date.
    pub fn start_param(&self) -> String {
        self.start.format("%Y%m%d").to_string()
    }

    /// Upstream wire format (`YYYYMMDD`) for the end date.
    pub fn end_param(&self) -> String {
        self.end.format("%Y%m%d").to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse_and_display() {
        assert_eq!("L1".parse::<IndustryLevel>().unwrap(), IndustryLevel::L1);
        assert_eq!("l2".parse::<IndustryLevel>().unwrap(), IndustryLevel::L2);
        assert_eq!("3".parse::<IndustryLevel>().unwrap(), IndustryLevel::L3);
        assert!("L4".parse::<IndustryLevel>().is_err());

        assert_eq!(IndustryLevel::L2.to_string(), "L2");
        assert_eq!(IndustryLevel::L3.display_name(), "三级行业");
    }

    #[test]
    fn test_date_range_years_back() {
        let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let range = DateRange::years_back(end, 1);
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2023, 7, 1).unwrap());
        assert_eq!(range.start_param(), "20230701");
        assert_eq!(range.end_param(), "20240630");
    }
}
