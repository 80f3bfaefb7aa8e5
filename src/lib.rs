//! MontePi - parallel Monte Carlo estimation of π
//!
//! Samples points uniformly in the unit square across a fixed set of
//! independent workers and scales the fraction landing inside the unit
//! quarter-circle by four.

use std::fmt;
use std::time::Duration;

// Public re-exports
pub mod bench;
pub mod config;
pub mod models;
pub mod simple;
pub mod util;

pub use simple::estimate_pi;

// Common error types
#[derive(Debug)]
pub enum MontePiError {
    /// Sample or worker count below one
    InvalidInput(String),
    /// Configuration validation or parsing error
    ConfigError(String),
    /// I/O operation failed
    IoError(std::io::Error),
    /// A worker panicked or could not be joined
    WorkerFailure(String),
    /// The run exceeded its configured timeout
    Timeout(Duration),
    /// The run was cancelled before every worker finished
    Cancelled(String),
}

impl fmt::Display for MontePiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MontePiError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            MontePiError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            MontePiError::IoError(err) => write!(f, "I/O error: {}", err),
            MontePiError::WorkerFailure(msg) => write!(f, "Worker failure: {}", msg),
            MontePiError::Timeout(limit) => {
                write!(f, "Timed out after {}", humantime::format_duration(*limit))
            }
            MontePiError::Cancelled(msg) => write!(f, "Cancelled: {}", msg),
        }
    }
}

impl std::error::Error for MontePiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MontePiError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MontePiError {
    fn from(err: std::io::Error) -> Self {
        MontePiError::IoError(err)
    }
}

impl From<toml::de::Error> for MontePiError {
    fn from(err: toml::de::Error) -> Self {
        MontePiError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

/// Result type alias for MontePi operations
pub type Result<T> = std::result::Result<T, MontePiError>;

/// Error handling utilities
pub mod error {
    use super::MontePiError;

    /// Exit code for a successful run
    pub const EXIT_OK: i32 = 0;
    /// Exit code for runtime failures (worker failure, timeout, cancellation)
    pub const EXIT_FAILURE: i32 = 1;
    /// Exit code for rejected input or configuration
    pub const EXIT_USAGE: i32 = 2;

    /// Check if an error was caused by the caller's request rather than the run
    pub fn is_usage_error(error: &MontePiError) -> bool {
        matches!(
            error,
            MontePiError::InvalidInput(_) | MontePiError::ConfigError(_)
        )
    }

    /// Process exit code for an error
    pub fn exit_code(error: &MontePiError) -> i32 {
        if is_usage_error(error) {
            EXIT_USAGE
        } else {
            EXIT_FAILURE
        }
    }

    /// Convert error to user-friendly message with suggestions
    pub fn user_friendly_message(error: &MontePiError) -> String {
        match error {
            MontePiError::InvalidInput(msg) => {
                format!("Invalid request: {}. Samples and workers must both be at least 1.", msg)
            }
            MontePiError::ConfigError(msg) => {
                format!("Configuration error: {}. Check your settings.", msg)
            }
            MontePiError::Timeout(_) => {
                format!("{}. Try fewer samples or a longer --timeout.", error)
            }
            MontePiError::Cancelled(_) => "Operation was cancelled.".to_string(),
            _ => error.to_string(),
        }
    }
}

// Common types and constants
pub const APP_NAME: &str = "montepi";
pub const CONFIG_FILE: &str = "montepi.toml";
