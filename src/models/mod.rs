//! Data models module
//!
//! Contains trial and outcome data models, the results report and
//! cross-run statistics.

pub mod result;
pub mod stats;

// Re-export commonly used types
pub use result::{
    BenchmarkReport, BenchmarkResult, InstallOutcome, IopsOutcome, LatencyStats, MetadataOutcome,
    Operation, PackageManager, RunResults, Section, SystemInfo, TestOutcome, TestRecord,
    ThroughputOutcome,
};
pub use stats::{aggregate_runs, AggregatedStat, AggregatedStatistics};
