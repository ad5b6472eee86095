//! Configuration management module
//!
//! Handles loading, saving, and validation of the run configuration.
//! The configuration is supplied once at start and never mutated while
//! the suite runs.

use crate::{FsPerfError, Result, APP_NAME, CACHE_DIR, CONFIG_FILE, RESULTS_FILE, TEST_DIR};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod persistence;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Run configuration structure containing all test parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Scratch directory the tests run in (created and removed per run)
    pub test_dir: PathBuf,
    /// Total bytes written (and read) by each sequential file-size tier
    pub data_size: u64,
    /// Number of times the whole suite is repeated
    pub num_runs: usize,
    /// Block size for sequential I/O (in bytes)
    pub block_size: u64,
    /// File-size tiers for the sequential tests
    pub file_sizes: Vec<u64>,
    /// Where the JSON report is written
    pub output: PathBuf,
    /// Keep the scratch directory after each run
    pub keep_temp_files: bool,
    // Tables last so the TOML output stays valid
    /// Random I/O test parameters
    pub random: RandomConfig,
    /// Small-file metadata test parameters
    pub metadata: MetadataConfig,
    /// Package-manager install workloads
    pub real_world: RealWorldConfig,
}

/// Random read/write test parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomConfig {
    /// Size of each random I/O (in bytes)
    pub block_size: u64,
    /// Files to test, each with its own operation count
    pub tests: Vec<RandomTest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomTest {
    pub file_size: u64,
    pub operations: u64,
}

/// Small-file creation/deletion parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub num_files: usize,
    pub file_size: u64,
}

/// npm/pip install workloads run against offline caches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealWorldConfig {
    pub enabled: bool,
    /// Root of the offline caches created by `fsperf setup-cache`
    pub cache_dir: PathBuf,
    /// Per-install timeout in seconds
    pub install_timeout_secs: u64,
    /// Packages primed into the npm cache
    pub npm_packages: Vec<String>,
    /// Packages primed into the pip wheel cache
    pub pip_packages: Vec<String>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            test_dir: PathBuf::from(TEST_DIR),
            data_size: GIB,
            num_runs: 5,
            block_size: 64 * KIB,
            file_sizes: vec![10 * MIB, 100 * MIB, 500 * MIB, GIB],
            random: RandomConfig::default(),
            metadata: MetadataConfig::default(),
            real_world: RealWorldConfig::default(),
            output: PathBuf::from(RESULTS_FILE),
            keep_temp_files: false,
        }
    }
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            block_size: 4 * KIB,
            tests: vec![
                RandomTest { file_size: 100 * MIB, operations: 5000 },
                RandomTest { file_size: 500 * MIB, operations: 10000 },
            ],
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            num_files: 5000,
            file_size: 4 * KIB,
        }
    }
}

impl Default for RealWorldConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: PathBuf::from(CACHE_DIR),
            install_timeout_secs: 600,
            npm_packages: ["express", "lodash", "react", "react-dom", "typescript", "webpack"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            pip_packages: ["requests", "numpy", "pandas", "flask", "pytest"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl RealWorldConfig {
    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }
}

impl BenchmarkConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Small sizes that finish in seconds; useful for smoke runs
    pub fn quick() -> Self {
        Self {
            data_size: 64 * MIB,
            num_runs: 3,
            file_sizes: vec![MIB, 8 * MIB, 32 * MIB],
            random: RandomConfig {
                block_size: 4 * KIB,
                tests: vec![RandomTest { file_size: 16 * MIB, operations: 1000 }],
            },
            metadata: MetadataConfig {
                num_files: 500,
                file_size: 4 * KIB,
            },
            ..Self::default()
        }
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.test_dir.is_file() {
            return Err(FsPerfError::ConfigError(format!(
                "Test directory is an existing file: {}",
                self.test_dir.display()
            )));
        }

        let parent = match self.test_dir.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !parent.is_dir() {
            return Err(FsPerfError::ConfigError(format!(
                "Parent of test directory does not exist: {}",
                parent.display()
            )));
        }

        if self.data_size == 0 {
            return Err(FsPerfError::ConfigError(
                "Data size must be greater than 0".to_string(),
            ));
        }

        const MAX_DATA_SIZE: u64 = 100 * GIB;
        if self.data_size > MAX_DATA_SIZE {
            return Err(FsPerfError::ConfigError(format!(
                "Data size too large: {} bytes (max: {} bytes)",
                self.data_size, MAX_DATA_SIZE
            )));
        }

        if self.num_runs == 0 {
            return Err(FsPerfError::ConfigError(
                "Number of runs must be greater than 0".to_string(),
            ));
        }

        validate_block_size("Block size", self.block_size)?;

        if self.file_sizes.is_empty() {
            return Err(FsPerfError::ConfigError(
                "At least one sequential file size is required".to_string(),
            ));
        }
        if self.file_sizes.iter().any(|&s| s == 0) {
            return Err(FsPerfError::ConfigError(
                "Sequential file sizes must be greater than 0".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.file_sizes.iter().find(|&&s| !seen.insert(s)) {
            return Err(FsPerfError::ConfigError(format!(
                "Duplicate sequential file size: {} bytes",
                dup
            )));
        }

        validate_block_size("Random block size", self.random.block_size)?;
        let mut seen = HashSet::new();
        for test in &self.random.tests {
            if !seen.insert(test.file_size) {
                return Err(FsPerfError::ConfigError(format!(
                    "Duplicate random test file size: {} bytes",
                    test.file_size
                )));
            }
            if test.file_size < self.random.block_size {
                return Err(FsPerfError::ConfigError(format!(
                    "Random test file ({} bytes) is smaller than the random block size ({} bytes)",
                    test.file_size, self.random.block_size
                )));
            }
            if test.operations == 0 {
                return Err(FsPerfError::ConfigError(
                    "Random test operation count must be greater than 0".to_string(),
                ));
            }
        }

        if self.metadata.num_files == 0 {
            return Err(FsPerfError::ConfigError(
                "Metadata test file count must be greater than 0".to_string(),
            ));
        }

        if self.real_world.enabled && self.real_world.install_timeout_secs == 0 {
            return Err(FsPerfError::ConfigError(
                "Install timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Set the scratch directory
    pub fn with_test_dir(mut self, path: PathBuf) -> Self {
        self.test_dir = path;
        self
    }

    /// Set the total data size per sequential tier
    pub fn with_data_size(mut self, size: u64) -> Self {
        self.data_size = size;
        self
    }

    /// Set the number of runs
    pub fn with_num_runs(mut self, runs: usize) -> Self {
        self.num_runs = runs;
        self
    }

    /// Set the sequential block size
    pub fn with_block_size(mut self, size: u64) -> Self {
        self.block_size = size;
        self
    }

    /// Set the sequential file-size tiers
    pub fn with_file_sizes(mut self, sizes: Vec<u64>) -> Self {
        self.file_sizes = sizes;
        self
    }

    /// Set the random test parameters
    pub fn with_random(mut self, random: RandomConfig) -> Self {
        self.random = random;
        self
    }

    /// Set the metadata test parameters
    pub fn with_metadata(mut self, num_files: usize, file_size: u64) -> Self {
        self.metadata = MetadataConfig { num_files, file_size };
        self
    }

    /// Enable or disable the package-manager workloads
    pub fn with_real_world(mut self, enabled: bool) -> Self {
        self.real_world.enabled = enabled;
        self
    }

    /// Set the report path
    pub fn with_output(mut self, path: PathBuf) -> Self {
        self.output = path;
        self
    }

    /// Set whether to keep the scratch directory
    pub fn with_keep_temp_files(mut self, keep: bool) -> Self {
        self.keep_temp_files = keep;
        self
    }

    /// Load configuration from the standard config file location
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load and validate configuration from an explicit TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FsPerfError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            FsPerfError::ConfigError(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to the standard config file location
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_file_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    FsPerfError::ConfigError(format!(
                        "Failed to create config directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(path, content).map_err(|e| {
            FsPerfError::ConfigError(format!(
                "Failed to write config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Get the standard configuration file path
    /// Uses $CONFIG_HOME/fsperf/fsperf.toml
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            FsPerfError::ConfigError("Unable to determine config directory".to_string())
        })?;

        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

fn validate_block_size(what: &str, size: u64) -> Result<()> {
    const MIN_BLOCK_SIZE: u64 = 512;
    const MAX_BLOCK_SIZE: u64 = 64 * MIB;

    if size == 0 {
        return Err(FsPerfError::ConfigError(format!(
            "{} must be greater than 0",
            what
        )));
    }
    if !size.is_power_of_two() {
        return Err(FsPerfError::ConfigError(format!(
            "{} must be a power of 2",
            what
        )));
    }
    if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&size) {
        return Err(FsPerfError::ConfigError(format!(
            "{} must be between {} and {} bytes",
            what, MIN_BLOCK_SIZE, MAX_BLOCK_SIZE
        )));
    }
    Ok(())
}
