//! Utility functions module
//!
//! Contains helper functions for units formatting, size and duration
//! parsing, and rate calculations.

pub mod units;

// Re-export commonly used functions
pub use units::{
    calculate_iops, calculate_throughput_bps, format_bytes, format_duration, format_iops,
    format_latency, format_speed, parse_bytes, parse_duration,
};
