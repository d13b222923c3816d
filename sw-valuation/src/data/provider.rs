//! Data source abstraction for index valuation data.
//!
//! Defines the `ValuationSource` trait the runner fetches through, and the
//! typed error every source returns.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt;

use super::{DailyValuation, IndexBasic};

// ============================================================================
// Provider Error
// ============================================================================

/// Message fragments Tushare uses when a caller exceeds its quota.
pub const RATE_LIMIT_PATTERNS: &[&str] = &["每分钟最多访问", "访问过于频繁"];

/// Check whether an upstream message signals rate limiting.
pub fn is_rate_limit_message(message: &str) -> bool {
    RATE_LIMIT_PATTERNS.iter().any(|p| message.contains(p))
}

/// Errors returned by data sources.
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// Network error (connection failed, timeout, non-2xx status)
    Network(String),
    /// Authentication error (invalid or missing token, insufficient points)
    Auth(String),
    /// Upstream asked us to slow down
    RateLimited { message: String },
    /// Upstream returned a non-zero business code
    Api { code: i64, message: String },
    /// Response body could not be decoded
    Parse(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Auth(msg) => write!(f, "Authentication error: {}", msg),
            Self::RateLimited { message } => write!(f, "Rate limited: {}", message),
            Self::Api { code, message } => write!(f, "API error {}: {}", code, message),
            Self::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Whether this error should trigger the long rate-limit cooldown.
    ///
    /// Besides the typed variant, any error whose message carries one of the
    /// known quota phrases counts, since upstream sometimes reports them as
    /// plain API errors.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            other => is_rate_limit_message(&other.to_string()),
        }
    }
}

// ============================================================================
// Valuation Source Trait
// ============================================================================

/// Upstream operations consumed by the valuation runner.
#[async_trait]
pub trait ValuationSource: Send + Sync {
    /// Source name for logging (e.g., "tushare")
    fn name(&self) -> &'static str;

    /// List indices published for a market (e.g., "SW").
    async fn list_indices(&self, market: &str) -> Result<Vec<IndexBasic>, ProviderError>;

    /// Fetch daily PE/PB history for one index.
    ///
    /// # Arguments
    /// * `ts_code` - Index code (e.g., "801010.SI")
    /// * `start_date` - First trade date, inclusive
    /// * `end_date` - Last trade date, inclusive
    async fn sw_daily(
        &self,
        ts_code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyValuation>, ProviderError>;
}

// ============================================================================
// Tests
// ============================================================================
