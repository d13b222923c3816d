//! SW Common - Shared configuration, errors and logging for the Shenwan
//! industry valuation tools.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - Error types and handling utilities
//! - Logging setup
//! - Small string utilities used when logging upstream responses

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod util;
pub mod validation;

pub use config::{Config, FetchConfig, ObservabilityConfig, OutputConfig, TushareConfig};
pub use error::{Error, Result};
pub use validation::{Validate, ValidationError, ValidationResult};
