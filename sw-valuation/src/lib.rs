//! SW Valuation Library
//!
//! Ranks the current PE and PB of Shenwan (申万) industry indices against
//! their own history, using daily valuation data from Tushare Pro.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    sw-valuation (batch job)                         │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐     │
//! │  │  Data           │  │  Valuation      │  │  Report         │     │
//! │  │  (Tushare +     │→ │  (percentile +  │→ │  (CSV, console, │     │
//! │  │   rate limiter) │  │   analyzer)     │  │   Markdown)     │     │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Percentile Rank
//! - Share of history below the current value, ties at half weight
//! - ≤ 20 reads as undervalued (🟢), ≥ 80 as overvalued (🔴)
//!
//! ## Rate Limits
//! - Tushare caps calls per minute per token
//! - Calls are spaced by a minimum interval and retried with a long
//!   cooldown when the quota message comes back
//!
//! ## Levels
//! - L1 (一级行业), L2 (二级行业), L3 (三级行业)

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod housekeeping;
pub mod job;
pub mod report;
pub mod runner;
pub mod valuation;

pub use data::{IndustryLevel, RateLimitedClient, TushareAdapter, ValuationSource};
pub use job::{run_daily, JobOptions, JobOutcome};
pub use runner::{RunSummary, ValuationRunner};
pub use valuation::{percentile_rank, IndexValuation, ValuationAnalyzer};
