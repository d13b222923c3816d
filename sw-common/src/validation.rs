//! Configuration validation.
//!
//! Checks that configured values are within usable ranges before a run
//! starts, so a bad config fails fast instead of mid-batch.

use thiserror::Error;

use crate::config::{Config, FetchConfig, ObservabilityConfig, OutputConfig, TushareConfig};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Validate for Config {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.tushare.validate() {
            errors.push(e);
        }
        if let Err(e) = self.fetch.validate() {
            errors.push(e);
        }
        if let Err(e) = self.output.validate() {
            errors.push(e);
        }
        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple(errors)),
        }
    }
}

impl Validate for TushareConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "tushare.base_url".into(),
            });
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidValue {
                field: "tushare.base_url".into(),
                reason: "must start with http:// or https://".into(),
            });
        }

        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "tushare.timeout_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }

        Ok(())
    }
}

impl Validate for FetchConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.max_retries == 0 {
            return Err(ValidationError::InvalidValue {
                field: "fetch.max_retries".into(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(())
    }
}

impl Validate for OutputConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.dir.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "output.dir".into(),
            });
        }

        if !self.trend_threshold.is_finite() || self.trend_threshold < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: "output.trend_threshold".into(),
                reason: "must be a non-negative number".into(),
            });
        }

        if self.history_years == 0 {
            return Err(ValidationError::InvalidValue {
                field: "output.history_years".into(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_level".into(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            });
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test_case("trace" ; "trace")]
    #[test_case("INFO" ; "uppercase info")]
    #[test_case("error" ; "error")]
    fn test_valid_log_levels(level: &str) {
        let config = ObservabilityConfig {
            log_level: level.into(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_format() {
        let config = ObservabilityConfig {
            log_format: "xml".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let config = FetchConfig {
            max_retries: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let config = TushareConfig {
            base_url: "api.tushare.pro".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_multiple_errors_collected() {
        let mut config = Config::default();
        config.fetch.max_retries = 0;
        config.output.trend_threshold = -1.0;
        config.observability.log_level = "loud".into();

        match config.validate() {
            Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected multiple errors, got {:?}", other),
        }
    }
}
