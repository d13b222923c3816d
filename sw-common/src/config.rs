//! Configuration management.
//!
//! The tools share one configuration file at `~/.sw-valuation/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Command line flags (applied by the binary)
//! 2. Environment variables
//! 3. Explicit config file values
//! 4. Default values
//!
//! # Environment Variable Mapping
//!
//! - `TUSHARE_TOKEN` → tushare.token
//! - `SW_LOG_LEVEL` → observability.log_level
//! - `SW_LOG_FORMAT` → observability.log_format
//! - `SW_OUTPUT_DIR` → output.dir

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".sw-valuation"),
        |dirs| dirs.home_dir().join(".sw-valuation"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Tushare Pro connection settings
    #[serde(default)]
    pub tushare: TushareConfig,

    /// Request pacing and retry policy
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Output artifacts and report settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging settings
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    ///
    /// An explicit `path` must exist; without one the default location is
    /// optional.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("TUSHARE_TOKEN") {
            if !token.trim().is_empty() {
                self.tushare.token = Some(token);
            }
        }

        if let Ok(level) = std::env::var("SW_LOG_LEVEL") {
            self.observability.log_level = level;
        }

        if let Ok(format) = std::env::var("SW_LOG_FORMAT") {
            self.observability.log_format = format;
        }

        if let Ok(dir) = std::env::var("SW_OUTPUT_DIR") {
            self.output.dir = dir;
        }
    }

    /// Get the Tushare token, failing when none is configured.
    pub fn require_token(&self) -> crate::Result<String> {
        self.tushare
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                crate::Error::Config(
                    "Tushare token is not set (use --token, TUSHARE_TOKEN or tushare.token)".into(),
                )
            })
    }
}

// ============================================================================
// Tushare Configuration
// ============================================================================

/// Tushare Pro connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TushareConfig {
    /// API token. Never defaulted; must be supplied explicitly.
    #[serde(default)]
    pub token: Option<String>,

    /// API endpoint
    #[serde(default = "default_tushare_url")]
    pub base_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TushareConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_tushare_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TushareConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_tushare_url() -> String {
    "http://api.tushare.pro".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

// ============================================================================
// Fetch Configuration
// ============================================================================

/// Request pacing and retry policy for upstream calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Minimum gap between two successful calls (milliseconds)
    #[serde(default = "default_request_interval_ms")]
    pub request_interval_ms: u64,

    /// Cooldown after a rate-limit response (seconds)
    #[serde(default = "default_rate_limit_wait_secs")]
    pub rate_limit_wait_secs: u64,

    /// Delay after any other failed call (seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Attempts per call, rate-limited attempts included
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_interval_ms: default_request_interval_ms(),
            rate_limit_wait_secs: default_rate_limit_wait_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl FetchConfig {
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    pub fn rate_limit_wait(&self) -> Duration {
        Duration::from_secs(self.rate_limit_wait_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

fn default_request_interval_ms() -> u64 {
    300
}

fn default_rate_limit_wait_secs() -> u64 {
    65
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_max_retries() -> u32 {
    5
}

// ============================================================================
// Output Configuration
// ============================================================================

/// Output artifacts and report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for CSV artifacts and reports (`~` is expanded)
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Age in days after which CSV artifacts are deleted by the daily job
    #[serde(default = "default_cleanup_days")]
    pub cleanup_days: u32,

    /// Years of history fetched by the daily job
    #[serde(default = "default_history_years")]
    pub history_years: u32,

    /// Age in days of the baseline artifact used for trend comparison
    #[serde(default = "default_trend_days")]
    pub trend_days: u32,

    /// Minimum percentile change (points) reported as a trend
    #[serde(default = "default_trend_threshold")]
    pub trend_threshold: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            cleanup_days: default_cleanup_days(),
            history_years: default_history_years(),
            trend_days: default_trend_days(),
            trend_threshold: default_trend_threshold(),
        }
    }
}

impl OutputConfig {
    /// Output directory with `~` and environment variables expanded.
    pub fn dir_path(&self) -> PathBuf {
        expand_path(&self.dir)
    }
}

/// Expand `~` and `$VAR` in a path string, falling back to the raw string.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(raw),
    }
}

fn default_output_dir() -> String {
    "./output".to_string()
}

fn default_cleanup_days() -> u32 {
    365
}

fn default_history_years() -> u32 {
    30
}

fn default_trend_days() -> u32 {
    7
}

fn default_trend_threshold() -> f64 {
    10.0
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.tushare.token.is_none());
        assert_eq!(config.tushare.base_url, "http://api.tushare.pro");
        assert_eq!(config.fetch.request_interval(), Duration::from_millis(300));
        assert_eq!(config.fetch.rate_limit_wait(), Duration::from_secs(65));
        assert_eq!(config.fetch.retry_delay(), Duration::from_secs(2));
        assert_eq!(config.fetch.max_retries, 5);
        assert_eq!(config.output.dir, "./output");
        assert_eq!(config.output.cleanup_days, 365);
        assert_eq!(config.output.trend_days, 7);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"tushare": {{"token": "abc"}}, "fetch": {{"max_retries": 3}}, "observability": {{"level": "debug"}}}}"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.tushare.token.as_deref(), Some("abc"));
        assert_eq!(config.tushare.timeout_secs, 30);
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.fetch.request_interval_ms, 300);
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_from(&dir.path().join("nope.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_require_token() {
        let mut config = Config::default();
        assert!(matches!(config.require_token(), Err(crate::Error::Config(_))));

        config.tushare.token = Some("   ".into());
        assert!(config.require_token().is_err());

        config.tushare.token = Some(" tok ".into());
        assert_eq!(config.require_token().unwrap(), "tok");
    }

    #[test]
    fn test_expand_path_plain() {
        assert_eq!(expand_path("./output"), PathBuf::from("./output"));
    }
}
