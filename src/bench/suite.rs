//! Benchmark suite
//!
//! One run executes every configured test in a fixed order inside a fresh
//! scratch directory; the suite repeats that `num_runs` times.

use crate::bench::install::InstallBenchmark;
use crate::bench::metadata::MetadataBenchmark;
use crate::bench::random::RandomBenchmark;
use crate::bench::sequential::{file_count, SequentialBenchmark};
use crate::config::BenchmarkConfig;
use crate::error::io_context;
use crate::io::disk::ScratchDir;
use crate::models::{BenchmarkReport, RunResults, TestOutcome};
use crate::report;
use crate::util::units::format_bytes;
use crate::Result;
use tracing::{info, warn};

/// Runs the configured tests and collects their outcomes
pub struct BenchmarkSuite {
    config: BenchmarkConfig,
    console: bool,
}

impl BenchmarkSuite {
    /// Validate `config` and build a suite around it
    pub fn new(config: BenchmarkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            console: true,
        })
    }

    /// Toggle console output and progress bars
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    fn header(&self, title: &str) {
        if self.console {
            report::print_section_header(title);
        }
    }

    fn line(&self, text: &str) {
        if self.console {
            println!("{}", text);
        }
    }

    fn record(&self, results: &mut RunResults, name: String, outcome: TestOutcome) {
        if self.console {
            report::print_outcome(&outcome);
        }
        results.push(name, outcome);
    }

    /// Tier sizes that fit in the configured total; larger ones are skipped
    fn tiers(&self) -> Vec<u64> {
        self.config
            .file_sizes
            .iter()
            .copied()
            .filter(|&size| {
                let fits = size <= self.config.data_size;
                if !fits {
                    warn!(
                        tier = size,
                        data_size = self.config.data_size,
                        "file size exceeds the total data size, skipping tier"
                    );
                }
                fits
            })
            .collect()
    }

    /// Execute every test once inside `<test_dir>/fsperf_scratch`, which is
    /// removed when the run ends, whether it succeeded or not.
    pub async fn run_once(&self, run: usize) -> Result<RunResults> {
        let config = &self.config;
        let scratch = ScratchDir::create(&config.test_dir, config.keep_temp_files).map_err(|e| {
            io_context(
                &format!("preparing scratch space in {}", config.test_dir.display()),
                e,
            )
        })?;
        let mut results = RunResults::new(run);
        let total = config.data_size;
        let tiers = self.tiers();

        info!(run, dir = %scratch.path().display(), "Starting run");

        let mut sequential = SequentialBenchmark::new(&scratch, config.block_size)
            .keep_files(config.keep_temp_files);

        self.header(&format!(
            "SEQUENTIAL WRITE TESTS ({} total per test)",
            format_bytes(total as f64)
        ));
        for &size in &tiers {
            self.line(&format!(
                "\nTesting {} files ({} file(s))...",
                format_bytes(size as f64),
                file_count(total, size)
            ));
            let pb = report::progress_bar(total, "write", !self.console);
            let outcome = sequential.write_tier(total, size, &pb)?;
            pb.finish_and_clear();
            self.record(&mut results, format!("seq_write_{}", size), TestOutcome::SequentialWrite(outcome));
        }

        self.header(&format!(
            "SEQUENTIAL READ TESTS ({} total per test)",
            format_bytes(total as f64)
        ));
        for &size in &tiers {
            self.line(&format!(
                "\nTesting {} files ({} file(s))...",
                format_bytes(size as f64),
                file_count(total, size)
            ));
            let pb = report::progress_bar(total, "read", !self.console);
            let outcome = sequential.read_tier(total, size, &pb)?;
            pb.finish_and_clear();
            self.record(&mut results, format!("seq_read_{}", size), TestOutcome::SequentialRead(outcome));
        }

        let mut random = RandomBenchmark::new(&scratch, config.random.block_size)
            .keep_files(config.keep_temp_files);
        let block = format_bytes(config.random.block_size as f64);

        self.header(&format!("RANDOM WRITE TESTS ({} blocks)", block));
        for test in &config.random.tests {
            self.line(&format!(
                "\nTesting {} file ({} operations)...",
                format_bytes(test.file_size as f64),
                test.operations
            ));
            let outcome = random.random_write(test.file_size, test.operations)?;
            self.record(
                &mut results,
                format!("rand_write_{}", test.file_size),
                TestOutcome::RandomWrite(outcome),
            );
        }

        self.header(&format!("RANDOM READ TESTS ({} blocks)", block));
        for test in &config.random.tests {
            self.line(&format!(
                "\nTesting {} file ({} operations)...",
                format_bytes(test.file_size as f64),
                test.operations
            ));
            let outcome = random.random_read(test.file_size, test.operations)?;
            self.record(
                &mut results,
                format!("rand_read_{}", test.file_size),
                TestOutcome::RandomRead(outcome),
            );
        }

        let mut metadata = MetadataBenchmark::new(&scratch);
        let num_files = config.metadata.num_files;

        self.header("METADATA OPERATIONS (Small File Tests)");
        self.line(&format!(
            "\nTesting file creation ({} files of {} each)...",
            num_files,
            format_bytes(config.metadata.file_size as f64)
        ));
        let outcome = metadata.create_files(num_files, config.metadata.file_size)?;
        self.record(&mut results, "file_creation".to_string(), TestOutcome::FileCreation(outcome));

        self.line(&format!("\nTesting file deletion ({} files)...", num_files));
        let outcome = metadata.delete_files()?;
        self.record(&mut results, "file_deletion".to_string(), TestOutcome::FileDeletion(outcome));

        if config.real_world.enabled {
            let installs = InstallBenchmark::new(&scratch, &config.real_world);
            self.header("REAL-WORLD WORKLOADS (offline package installs)");

            self.line("\nTesting npm install...");
            match installs.npm_install().await? {
                Some(outcome) => self.record(
                    &mut results,
                    "npm_install".to_string(),
                    TestOutcome::PackageInstall(outcome),
                ),
                None => self.line("  Skipped (npm or its cache is not available)"),
            }

            self.line("\nTesting pip install...");
            match installs.pip_install().await? {
                Some(outcome) => self.record(
                    &mut results,
                    "pip_install".to_string(),
                    TestOutcome::PackageInstall(outcome),
                ),
                None => self.line("  Skipped (pip or its cache is not available)"),
            }
        }

        info!(run, tests = results.len(), "Run complete");
        Ok(results)
    }

    /// Run the suite `num_runs` times, printing each run's summary
    pub async fn run_all(&self) -> Result<Vec<RunResults>> {
        let num_runs = self.config.num_runs;
        let mut runs = Vec::with_capacity(num_runs);

        for run in 1..=num_runs {
            if self.console {
                report::print_run_header(run, num_runs);
            }
            let results = self.run_once(run).await?;
            if self.console {
                report::print_run_summary(&results);
                println!("\nCompleted run {}/{}", run, num_runs);
            }
            runs.push(results);
        }

        Ok(runs)
    }

    /// Run everything and assemble the report with aggregated statistics
    pub async fn run_report(&self) -> Result<BenchmarkReport> {
        let runs = self.run_all().await?;
        Ok(BenchmarkReport::new(self.config.clone(), runs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RandomConfig, RandomTest};
    use tempfile::tempdir;

    fn tiny_config(dir: &std::path::Path) -> BenchmarkConfig {
        BenchmarkConfig::default()
            .with_test_dir(dir.join("bench"))
            .with_data_size(256 * 1024)
            .with_num_runs(2)
            .with_block_size(16 * 1024)
            .with_file_sizes(vec![64 * 1024, 100 * 1024, 1024 * 1024])
            .with_random(RandomConfig {
                block_size: 4096,
                tests: vec![RandomTest {
                    file_size: 128 * 1024,
                    operations: 50,
                }],
            })
            .with_metadata(20, 1024)
            .with_real_world(false)
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let temp_dir = tempdir().unwrap();
        let config = tiny_config(temp_dir.path()).with_num_runs(0);
        assert!(BenchmarkSuite::new(config).is_err());
    }

    #[test]
    fn test_tiers_larger_than_total_are_skipped() {
        let temp_dir = tempdir().unwrap();
        let suite = BenchmarkSuite::new(tiny_config(temp_dir.path())).unwrap();
        assert_eq!(suite.tiers(), vec![64 * 1024, 100 * 1024]);
    }

    #[tokio::test]
    async fn test_run_once_records_every_test_in_order() {
        let temp_dir = tempdir().unwrap();
        let config = tiny_config(temp_dir.path());
        let suite = BenchmarkSuite::new(config.clone()).unwrap().with_console(false);

        let results = suite.run_once(1).await.unwrap();
        let names: Vec<&str> = results.tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "seq_write_65536",
                "seq_write_102400",
                "seq_read_65536",
                "seq_read_102400",
                "rand_write_131072",
                "rand_read_131072",
                "file_creation",
                "file_deletion",
            ]
        );

        for name in ["seq_write_65536", "seq_write_102400"] {
            match results.get(name) {
                Some(TestOutcome::SequentialWrite(o)) => {
                    assert_eq!(o.total_bytes, config.data_size);
                    assert!(o.speed_bytes_per_sec >= 0.0);
                }
                other => panic!("unexpected outcome for {}: {:?}", name, other),
            }
        }

        match results.get("file_deletion") {
            Some(TestOutcome::FileDeletion(o)) => assert_eq!(o.files, 20),
            other => panic!("unexpected deletion outcome: {:?}", other),
        }

        assert!(!config.test_dir.exists());
    }

    #[tokio::test]
    async fn test_run_leaves_existing_test_dir_contents_alone() {
        let temp_dir = tempdir().unwrap();
        let user_dir = temp_dir.path().join("mnt");
        std::fs::create_dir_all(user_dir.join("photos")).unwrap();
        std::fs::write(user_dir.join("photos/wedding.jpg"), b"jpeg").unwrap();

        let config = tiny_config(temp_dir.path()).with_test_dir(user_dir.clone());
        let suite = BenchmarkSuite::new(config).unwrap().with_console(false);
        suite.run_report().await.unwrap();

        assert!(user_dir.join("photos/wedding.jpg").exists());
        assert!(!user_dir.join(crate::io::disk::SCRATCH_DIR_NAME).exists());
    }

    #[tokio::test]
    async fn test_run_report_aggregates_runs() {
        let temp_dir = tempdir().unwrap();
        let suite = BenchmarkSuite::new(tiny_config(temp_dir.path()))
            .unwrap()
            .with_console(false);

        let report = suite.run_report().await.unwrap();
        assert_eq!(report.num_runs, 2);
        assert_eq!(report.all_runs.len(), 2);
        assert_eq!(report.all_runs[1].run, 2);

        let stat = &report.aggregated_statistics["file_creation"]["files_per_sec"];
        assert_eq!(stat.values.len(), 2);
        let expected = (stat.values[0] + stat.values[1]) / 2.0;
        assert!((stat.mean - expected).abs() < 1e-9 * expected.max(1.0));
    }
}
