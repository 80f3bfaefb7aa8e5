//! Utility functions module
//!
//! Contains helper functions for count and duration formatting,
//! rate calculation, and logging setup.

pub mod logging;
pub mod units;

// Re-export commonly used functions
pub use units::{
    format_count, parse_count,
    format_duration, parse_duration,
    calculate_rate, format_rate,
};
