//! Benchmark engine module
//!
//! Contains the timed runner, the individual benchmarks and the suite
//! that sequences them into runs.

pub mod install;
pub mod metadata;
pub mod random;
pub mod sequential;
pub mod suite;
pub mod timer;

// Re-export commonly used types
pub use install::{setup_cache, CacheLayout, CacheSetupSummary, InstallBenchmark};
pub use metadata::MetadataBenchmark;
pub use random::RandomBenchmark;
pub use sequential::{file_count, file_plan, SequentialBenchmark};
pub use suite::BenchmarkSuite;
pub use timer::{run_timed, time, LatencyRecorder, Timed};
