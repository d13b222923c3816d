//! Shenwan industry classification.
//!
//! The `SW` listing mixes the three industry tiers with style, size and
//! thematic indices. Tiers are told apart by code shape:
//!
//! | tier | code        | example      |
//! |------|-------------|--------------|
//! | L1   | `801xx0.SI` | `801010.SI`  |
//! | L2   | `801xxx.SI` | `801016.SI`  |
//! | L3   | `850xxx.SI` | `850111.SI`  |
//!
//! and non-industry indices are dropped by name.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::{IndexBasic, IndustryIndex, IndustryLevel};

/// Market code of the Shenwan index family.
pub const SW_MARKET: &str = "SW";

/// Name marker every Shenwan industry index carries.
const SW_NAME_MARKER: &str = "申万";

static L1_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^801\d{2}0\.SI$").unwrap());
static L2_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^801\d{3}\.SI$").unwrap());
static L2_SERIES_300: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^8013\d{2}\.SI$").unwrap());
static L3_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^850\d{3}\.SI$").unwrap());

const L1_EXCLUDED: &[&str] = &[
    "申万50",
    "申万中小",
    "申万A股",
    "申万创业",
    "申万300",
    "申万制造",
    "申万消费",
    "申万投资",
    "申万服务",
    "申万宏源",
];

const L2_EXCLUDED: &[&str] = &[
    "申万50",
    "申万中小",
    "申万A股",
    "申万创业",
    "申万300",
    "申万宏源",
    "大盘指数",
    "中盘指数",
    "小盘指数",
    "高市盈率",
    "中市盈率",
    "低市盈率",
    "高市净率",
    "中市净率",
    "低市净率",
    "高价股",
    "中价股",
    "低价股",
    "亏损股",
    "微利股",
    "绩优股",
    "配股指数",
    "活跃指数",
    "新股指数",
    "基金重仓",
    "基金核心",
    "申万重点",
];

const L3_EXCLUDED: &[&str] = &[
    "申万50",
    "申万中小",
    "申万A股",
    "申万创业",
    "申万300",
    "申万宏源",
];

/// Check whether a code belongs to a tier, ignoring names.
pub fn code_matches(level: IndustryLevel, ts_code: &str) -> bool {
    match level {
        IndustryLevel::L1 => L1_CODE.is_match(ts_code),
        IndustryLevel::L2 => {
            L2_CODE.is_match(ts_code)
                && !L1_CODE.is_match(ts_code)
                && !L2_SERIES_300.is_match(ts_code)
        }
        IndustryLevel::L3 => L3_CODE.is_match(ts_code),
    }
}

fn excluded_names(level: IndustryLevel) -> &'static [&'static str] {
    match level {
        IndustryLevel::L1 => L1_EXCLUDED,
        IndustryLevel::L2 => L2_EXCLUDED,
        IndustryLevel::L3 => L3_EXCLUDED,
    }
}

/// Check whether a name is an industry index name for a tier.
pub fn name_matches(level: IndustryLevel, name: &str) -> bool {
    name.contains(SW_NAME_MARKER) && !excluded_names(level).iter().any(|p| name.contains(p))
}

/// Select the industry indices of one tier from the raw listing.
///
/// Listing order is kept. A code that appears twice keeps its first entry.
pub fn classify(listing: &[IndexBasic], level: IndustryLevel) -> Vec<IndustryIndex> {
    let mut seen = HashSet::new();

    listing
        .iter()
        .filter(|item| code_matches(level, &item.ts_code) && name_matches(level, &item.name))
        .filter(|item| seen.insert(item.ts_code.clone()))
        .map(|item| IndustryIndex {
            ts_code: item.ts_code.clone(),
            name: item.name.clone(),
            level,
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
