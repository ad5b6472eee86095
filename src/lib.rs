//! fsperf - File-System Performance bench
//!
//! Measures sequential and random read/write throughput, metadata
//! operation rates and real-world package-manager installs against a
//! local filesystem, repeating the suite and aggregating the results.

use std::fmt;

pub mod bench;
pub mod config;
pub mod io;
pub mod models;
pub mod report;
pub mod util;

// Common error types
#[derive(Debug)]
pub enum FsPerfError {
    /// I/O operation failed
    IoError(std::io::Error),
    /// Configuration validation or parsing error
    ConfigError(String),
    /// Benchmark execution error
    BenchmarkError(String),
    /// Permission denied for disk operations
    PermissionDenied(String),
    /// Insufficient disk space
    InsufficientSpace(String),
    /// Results persistence error
    PersistenceError(String),
    /// External command (npm, pip) failed or timed out
    CommandError(String),
}

impl fmt::Display for FsPerfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsPerfError::IoError(err) => write!(f, "I/O error: {}", err),
            FsPerfError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            FsPerfError::BenchmarkError(msg) => write!(f, "Benchmark error: {}", msg),
            FsPerfError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            FsPerfError::InsufficientSpace(msg) => write!(f, "Insufficient disk space: {}", msg),
            FsPerfError::PersistenceError(msg) => write!(f, "Results persistence error: {}", msg),
            FsPerfError::CommandError(msg) => write!(f, "External command error: {}", msg),
        }
    }
}

impl std::error::Error for FsPerfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FsPerfError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FsPerfError {
    fn from(err: std::io::Error) -> Self {
        if error::is_out_of_space(&err) {
            return FsPerfError::InsufficientSpace(err.to_string());
        }
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                FsPerfError::PermissionDenied(format!("Access denied: {}", err))
            }
            _ => FsPerfError::IoError(err),
        }
    }
}

impl From<serde_json::Error> for FsPerfError {
    fn from(err: serde_json::Error) -> Self {
        FsPerfError::PersistenceError(format!("JSON serialization error: {}", err))
    }
}

impl From<toml::de::Error> for FsPerfError {
    fn from(err: toml::de::Error) -> Self {
        FsPerfError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for FsPerfError {
    fn from(err: toml::ser::Error) -> Self {
        FsPerfError::ConfigError(format!("TOML serialization error: {}", err))
    }
}

/// Result type alias for fsperf operations
pub type Result<T> = std::result::Result<T, FsPerfError>;

/// Error handling utilities
pub mod error {
    use super::FsPerfError;

    /// Whether an OS error means the target filesystem is full
    pub fn is_out_of_space(err: &std::io::Error) -> bool {
        #[cfg(unix)]
        {
            err.raw_os_error() == Some(libc::ENOSPC)
        }
        #[cfg(not(unix))]
        {
            // ERROR_DISK_FULL / ERROR_HANDLE_DISK_FULL
            matches!(err.raw_os_error(), Some(112) | Some(39))
        }
    }

    /// Attach the failing step to an I/O error while keeping its classification
    pub fn io_context(step: &str, err: std::io::Error) -> FsPerfError {
        match FsPerfError::from(err) {
            FsPerfError::IoError(inner) => {
                FsPerfError::IoError(std::io::Error::new(inner.kind(), format!("{}: {}", step, inner)))
            }
            FsPerfError::PermissionDenied(msg) => {
                FsPerfError::PermissionDenied(format!("{}: {}", step, msg))
            }
            FsPerfError::InsufficientSpace(msg) => {
                FsPerfError::InsufficientSpace(format!("{}: {}", step, msg))
            }
            other => other,
        }
    }

    /// Convert error to user-friendly message with suggestions
    pub fn user_friendly_message(error: &FsPerfError) -> String {
        match error {
            FsPerfError::PermissionDenied(_) => {
                "Permission denied. Pick a test directory you can write to (--dir).".to_string()
            }
            FsPerfError::InsufficientSpace(_) => {
                "Insufficient disk space. Free up space or lower the data size (--data-size)."
                    .to_string()
            }
            FsPerfError::ConfigError(msg) => {
                format!("Configuration error: {}. Check your settings.", msg)
            }
            FsPerfError::PersistenceError(_) => {
                "Failed to save results. Check the output path and free space.".to_string()
            }
            FsPerfError::CommandError(msg) => {
                format!("{}. Run `fsperf setup-cache` first or pass --skip-real-world.", msg)
            }
            _ => error.to_string(),
        }
    }
}

// Common types and constants
pub const APP_NAME: &str = "fsperf";
pub const CONFIG_FILE: &str = "fsperf.toml";
pub const RESULTS_FILE: &str = "benchmark_results.json";
pub const TEST_DIR: &str = "benchmark_temp";
pub const CACHE_DIR: &str = "benchmark_cache";

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error_classification() {
        let err: FsPerfError = io::Error::new(io::ErrorKind::PermissionDenied, "nope").into();
        assert!(matches!(err, FsPerfError::PermissionDenied(_)));

        let err: FsPerfError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, FsPerfError::IoError(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_enospc_maps_to_insufficient_space() {
        let err: FsPerfError = io::Error::from_raw_os_error(libc::ENOSPC).into();
        assert!(matches!(err, FsPerfError::InsufficientSpace(_)));
    }

    #[test]
    fn test_io_context_keeps_kind() {
        let err = error::io_context("writing seq.bin", io::Error::new(io::ErrorKind::NotFound, "x"));
        match err {
            FsPerfError::IoError(inner) => {
                assert_eq!(inner.kind(), io::ErrorKind::NotFound);
                assert!(inner.to_string().contains("writing seq.bin"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_user_friendly_message() {
        let msg = error::user_friendly_message(&FsPerfError::InsufficientSpace("x".into()));
        assert!(msg.contains("--data-size"));
        let msg = error::user_friendly_message(&FsPerfError::CommandError("npm missing".into()));
        assert!(msg.starts_with("npm missing"));
    }
}
