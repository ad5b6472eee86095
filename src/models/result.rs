//! Benchmark result data models
//!
//! Contains structures for storing and serializing single trials,
//! per-test outcomes, whole runs and the final report.

use crate::config::BenchmarkConfig;
use crate::models::stats::AggregatedStatistics;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Kind of I/O work a trial measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    SequentialWrite,
    SequentialRead,
    RandomWrite,
    RandomRead,
    FileCreate,
    FileDelete,
}

/// One measured trial. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub operation: Operation,
    /// Size of the file the trial worked on
    pub file_size: u64,
    /// Bytes actually transferred
    pub bytes: u64,
    /// Number of discrete I/O operations (blocks, files, installs)
    pub operations: u64,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Bytes per second
    pub throughput_bps: f64,
    pub iops: f64,
}

impl BenchmarkResult {
    /// Record a trial, deriving throughput and IOPS from the raw counts
    pub fn new(
        operation: Operation,
        file_size: u64,
        bytes: u64,
        operations: u64,
        duration: Duration,
    ) -> Self {
        use crate::util::units::{calculate_iops, calculate_throughput_bps};

        Self {
            operation,
            file_size,
            bytes,
            operations,
            duration,
            throughput_bps: calculate_throughput_bps(bytes, duration),
            iops: calculate_iops(operations, duration),
        }
    }
}

/// Latency statistics with min/avg/max and percentiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LatencyStats {
    #[serde(with = "duration_serde")]
    pub min: Duration,
    #[serde(with = "duration_serde")]
    pub avg: Duration,
    #[serde(with = "duration_serde")]
    pub max: Duration,
    /// Latency percentiles (50th, 95th, 99th)
    #[serde(with = "percentiles_serde")]
    pub percentiles: HashMap<u8, Duration>,
}

impl LatencyStats {
    /// Get the 50th percentile latency
    pub fn p50(&self) -> Duration {
        self.percentiles.get(&50).copied().unwrap_or(self.avg)
    }

    /// Get the 95th percentile latency
    pub fn p95(&self) -> Duration {
        self.percentiles.get(&95).copied().unwrap_or(self.max)
    }

    /// Get the 99th percentile latency
    pub fn p99(&self) -> Duration {
        self.percentiles.get(&99).copied().unwrap_or(self.max)
    }

    /// Create latency statistics from a list of samples
    pub fn from_samples(samples: &[Duration]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort();
        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        let avg_nanos: u128 =
            sorted.iter().map(|d| d.as_nanos()).sum::<u128>() / sorted.len() as u128;
        let avg = Duration::from_nanos(avg_nanos as u64);

        let mut percentiles = HashMap::new();
        for p in [50u8, 95, 99] {
            let idx = (sorted.len() * p as usize / 100).min(sorted.len() - 1);
            percentiles.insert(p, sorted[idx]);
        }

        Self {
            min,
            avg,
            max,
            percentiles,
        }
    }
}

/// Package manager driven by the real-world workloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Npm,
    Pip,
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PackageManager::Npm => "npm",
            PackageManager::Pip => "pip",
        })
    }
}

/// Sequential tier outcome: many files of one size, summed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputOutcome {
    pub file_size: u64,
    pub num_files: u64,
    pub total_bytes: u64,
    pub duration_sec: f64,
    pub speed_bytes_per_sec: f64,
    pub speed_formatted: String,
    /// One trial per file, in the order they ran
    pub trials: Vec<BenchmarkResult>,
}

impl ThroughputOutcome {
    /// Sum the per-file trials into the tier result
    pub fn from_trials(file_size: u64, trials: Vec<BenchmarkResult>) -> Self {
        use crate::util::units::{calculate_throughput_bps, format_speed};

        let total_bytes: u64 = trials.iter().map(|t| t.bytes).sum();
        let total_time: Duration = trials.iter().map(|t| t.duration).sum();
        let speed = calculate_throughput_bps(total_bytes, total_time);

        Self {
            file_size,
            num_files: trials.len() as u64,
            total_bytes,
            duration_sec: total_time.as_secs_f64(),
            speed_bytes_per_sec: speed,
            speed_formatted: format_speed(speed),
            trials,
        }
    }
}

/// Random I/O outcome for one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IopsOutcome {
    pub file_size: u64,
    pub block_size: u64,
    pub operations: u64,
    pub duration_sec: f64,
    pub iops: f64,
    pub avg_latency_ms: f64,
    pub latency: LatencyStats,
}

impl IopsOutcome {
    pub fn new(trial: &BenchmarkResult, block_size: u64, latency: LatencyStats) -> Self {
        let duration_sec = trial.duration.as_secs_f64();
        let avg_latency_ms = if trial.operations > 0 {
            duration_sec / trial.operations as f64 * 1000.0
        } else {
            0.0
        };

        Self {
            file_size: trial.file_size,
            block_size,
            operations: trial.operations,
            duration_sec,
            iops: trial.iops,
            avg_latency_ms,
            latency,
        }
    }
}

/// Small-file creation or deletion outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataOutcome {
    pub files: u64,
    pub file_size: u64,
    pub duration_sec: f64,
    pub files_per_sec: f64,
    pub avg_time_per_file_ms: f64,
}

impl MetadataOutcome {
    pub fn from_trial(trial: &BenchmarkResult) -> Self {
        let duration_sec = trial.duration.as_secs_f64();
        let avg_time_per_file_ms = if trial.operations > 0 {
            duration_sec / trial.operations as f64 * 1000.0
        } else {
            0.0
        };

        Self {
            files: trial.operations,
            file_size: trial.file_size,
            duration_sec,
            files_per_sec: trial.iops,
            avg_time_per_file_ms,
        }
    }
}

/// Package-manager install outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallOutcome {
    pub manager: PackageManager,
    pub packages: u64,
    pub duration_sec: f64,
    /// Bytes the install left in the target directory
    pub installed_bytes: u64,
}

/// Result of one test within one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestOutcome {
    SequentialWrite(ThroughputOutcome),
    SequentialRead(ThroughputOutcome),
    RandomWrite(IopsOutcome),
    RandomRead(IopsOutcome),
    FileCreation(MetadataOutcome),
    FileDeletion(MetadataOutcome),
    PackageInstall(InstallOutcome),
}

/// Report section a test belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Section {
    SequentialWrite,
    SequentialRead,
    RandomWrite,
    RandomRead,
    Metadata,
    RealWorld,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::SequentialWrite,
        Section::SequentialRead,
        Section::RandomWrite,
        Section::RandomRead,
        Section::Metadata,
        Section::RealWorld,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Section::SequentialWrite => "SEQUENTIAL WRITE PERFORMANCE",
            Section::SequentialRead => "SEQUENTIAL READ PERFORMANCE",
            Section::RandomWrite => "RANDOM WRITE PERFORMANCE",
            Section::RandomRead => "RANDOM READ PERFORMANCE",
            Section::Metadata => "METADATA OPERATIONS",
            Section::RealWorld => "REAL-WORLD WORKLOADS",
        }
    }

    /// Section of a test, derived from its name prefix
    pub fn of_test(name: &str) -> Option<Section> {
        if name.starts_with("seq_write_") {
            Some(Section::SequentialWrite)
        } else if name.starts_with("seq_read_") {
            Some(Section::SequentialRead)
        } else if name.starts_with("rand_write_") {
            Some(Section::RandomWrite)
        } else if name.starts_with("rand_read_") {
            Some(Section::RandomRead)
        } else if name.starts_with("file_") {
            Some(Section::Metadata)
        } else if name.ends_with("_install") {
            Some(Section::RealWorld)
        } else {
            None
        }
    }
}

impl TestOutcome {
    pub fn section(&self) -> Section {
        match self {
            TestOutcome::SequentialWrite(_) => Section::SequentialWrite,
            TestOutcome::SequentialRead(_) => Section::SequentialRead,
            TestOutcome::RandomWrite(_) => Section::RandomWrite,
            TestOutcome::RandomRead(_) => Section::RandomRead,
            TestOutcome::FileCreation(_) | TestOutcome::FileDeletion(_) => Section::Metadata,
            TestOutcome::PackageInstall(_) => Section::RealWorld,
        }
    }

    pub fn duration_sec(&self) -> f64 {
        match self {
            TestOutcome::SequentialWrite(o) | TestOutcome::SequentialRead(o) => o.duration_sec,
            TestOutcome::RandomWrite(o) | TestOutcome::RandomRead(o) => o.duration_sec,
            TestOutcome::FileCreation(o) | TestOutcome::FileDeletion(o) => o.duration_sec,
            TestOutcome::PackageInstall(o) => o.duration_sec,
        }
    }

    /// Numeric metrics of this outcome, by name, for cross-run aggregation
    pub fn metrics(&self) -> Vec<(&'static str, f64)> {
        match self {
            TestOutcome::SequentialWrite(o) | TestOutcome::SequentialRead(o) => vec![
                ("duration_sec", o.duration_sec),
                ("speed_bytes_per_sec", o.speed_bytes_per_sec),
                ("num_files", o.num_files as f64),
                ("total_bytes", o.total_bytes as f64),
            ],
            TestOutcome::RandomWrite(o) | TestOutcome::RandomRead(o) => vec![
                ("duration_sec", o.duration_sec),
                ("iops", o.iops),
                ("avg_latency_ms", o.avg_latency_ms),
                ("operations", o.operations as f64),
            ],
            TestOutcome::FileCreation(o) | TestOutcome::FileDeletion(o) => vec![
                ("duration_sec", o.duration_sec),
                ("files", o.files as f64),
                ("files_per_sec", o.files_per_sec),
                ("avg_time_per_file_ms", o.avg_time_per_file_ms),
            ],
            TestOutcome::PackageInstall(o) => vec![
                ("duration_sec", o.duration_sec),
                ("packages", o.packages as f64),
                ("installed_bytes", o.installed_bytes as f64),
            ],
        }
    }
}

/// A named test outcome within a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    pub name: String,
    #[serde(flatten)]
    pub outcome: TestOutcome,
}

/// Every test outcome of one suite run, in execution order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunResults {
    pub run: usize,
    pub tests: Vec<TestRecord>,
}

impl RunResults {
    pub fn new(run: usize) -> Self {
        Self {
            run,
            tests: Vec::new(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, outcome: TestOutcome) {
        self.tests.push(TestRecord {
            name: name.into(),
            outcome,
        });
    }

    pub fn get(&self, name: &str) -> Option<&TestOutcome> {
        self.tests
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.outcome)
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

/// System information captured at benchmark time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Operating system and architecture
    pub os: String,
    pub hostname: String,
    pub cpu_count: usize,
    /// Version of fsperf that produced the report
    pub version: String,
}

impl SystemInfo {
    /// Create system info by detecting current system
    pub fn detect() -> Self {
        Self {
            os: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            hostname: detect_hostname(),
            cpu_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[cfg(unix)]
fn detect_hostname() -> String {
    let mut buf = [0u8; 256];
    // SAFETY: buf is valid for buf.len() bytes; gethostname NUL-terminates on success.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        return "unknown".to_string();
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

#[cfg(not(unix))]
fn detect_hostname() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_else(|_| "unknown".to_string())
}

/// The results file: configuration, every run and the aggregated statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub timestamp: DateTime<Local>,
    pub test_directory: String,
    pub num_runs: usize,
    pub config: BenchmarkConfig,
    pub system_info: SystemInfo,
    pub aggregated_statistics: AggregatedStatistics,
    pub all_runs: Vec<RunResults>,
}

impl BenchmarkReport {
    /// Assemble the report, aggregating every metric across the runs
    pub fn new(config: BenchmarkConfig, all_runs: Vec<RunResults>) -> Self {
        let test_directory = std::path::absolute(&config.test_dir)
            .unwrap_or_else(|_| config.test_dir.clone())
            .display()
            .to_string();

        Self {
            timestamp: Local::now(),
            test_directory,
            num_runs: all_runs.len(),
            aggregated_statistics: crate::models::stats::aggregate_runs(&all_runs),
            config,
            system_info: SystemInfo::detect(),
            all_runs,
        }
    }
}

// Custom serde modules for Duration serialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_nanos() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}

mod percentiles_serde {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::{BTreeMap, HashMap};
    use std::time::Duration;

    // Keys are written as "p50" strings so the map survives buffering
    // inside internally tagged enums.
    pub fn serialize<S>(
        percentiles: &HashMap<u8, Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let nanos_map: BTreeMap<String, u64> = percentiles
            .iter()
            .map(|(&k, &v)| (format!("p{}", k), v.as_nanos() as u64))
            .collect();
        nanos_map.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<HashMap<u8, Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos_map = BTreeMap::<String, u64>::deserialize(deserializer)?;
        nanos_map
            .into_iter()
            .map(|(k, v)| {
                let pct = k
                    .trim_start_matches('p')
                    .parse::<u8>()
                    .map_err(|_| D::Error::custom(format!("invalid percentile key: {}", k)))?;
                Ok((pct, Duration::from_nanos(v)))
            })
            .collect()
    }
}
