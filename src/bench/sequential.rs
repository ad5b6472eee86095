//! Sequential benchmark operations
//!
//! Implements sequential read and write benchmarks with configurable
//! file size and block size. A tier writes (or reads) the configured
//! total data size split into files of one size.

use crate::bench::timer;
use crate::error::io_context;
use crate::io::disk::{create_disk_io, DiskIO, PlatformDiskIO, ScratchDir};
use crate::io::buffer::WorkloadGenerator;
use crate::models::{BenchmarkResult, Operation, ThroughputOutcome};
use crate::Result;
use indicatif::ProgressBar;
use std::io::{Read, Write};
use tracing::debug;

const WRITE_FILE: &str = "sequential_write_test.bin";
const READ_FILE: &str = "sequential_read_test.bin";

/// Number of files in a tier: `total / size` full files plus one file
/// holding the remainder, so the sizes always sum to `total`.
pub fn file_count(total: u64, file_size: u64) -> u64 {
    if file_size == 0 {
        return 0;
    }
    total / file_size + u64::from(total % file_size > 0)
}

/// Size of file `index` of a tier; only meaningful below `file_count`
fn planned_size(total: u64, file_size: u64, index: u64) -> u64 {
    if index < total / file_size {
        file_size
    } else {
        total % file_size
    }
}

/// Sizes of the files a tier consists of, produced lazily
pub fn file_plan(total: u64, file_size: u64) -> impl Iterator<Item = u64> {
    (0..file_count(total, file_size)).map(move |i| planned_size(total, file_size, i))
}

/// Sequential benchmark executor
pub struct SequentialBenchmark<'a> {
    scratch: &'a ScratchDir,
    block_size: u64,
    disk_io: PlatformDiskIO,
    generator: WorkloadGenerator,
    keep_files: bool,
}

impl<'a> SequentialBenchmark<'a> {
    /// Create a new sequential benchmark executor working inside `scratch`
    pub fn new(scratch: &'a ScratchDir, block_size: u64) -> Self {
        Self {
            scratch,
            block_size,
            disk_io: create_disk_io(),
            generator: WorkloadGenerator::new(),
            keep_files: false,
        }
    }

    /// Leave test files behind for inspection
    pub fn keep_files(mut self, keep: bool) -> Self {
        self.keep_files = keep;
        self
    }

    /// Write one file of `file_size` bytes, fsync it and time the whole thing
    pub fn write_file(&mut self, file_size: u64) -> Result<BenchmarkResult> {
        let block = self.generator.data(self.block_size as usize);
        let mut temp_file = self.scratch.temp_file(WRITE_FILE);
        if self.keep_files {
            temp_file.keep_on_drop();
        }
        let path = temp_file.path().to_path_buf();
        let block_size = self.block_size;
        let disk_io = &self.disk_io;

        let timed = timer::time(|| {
            let mut file = disk_io
                .create_write(&path)
                .map_err(|e| io_context("creating sequential write file", e))?;
            let mut written = 0u64;
            let mut blocks = 0u64;
            while written < file_size {
                let chunk = std::cmp::min(file_size - written, block_size) as usize;
                file.write_all(&block[..chunk])
                    .map_err(|e| io_context(&format!("writing at byte {}", written), e))?;
                written += chunk as u64;
                blocks += 1;
            }
            file.flush()
                .map_err(|e| io_context("flushing sequential write file", e))?;
            disk_io
                .sync(&file)
                .map_err(|e| io_context("syncing sequential write file", e))?;
            Ok((written, blocks))
        })?;

        if !self.keep_files {
            temp_file
                .remove()
                .map_err(|e| io_context("removing sequential write file", e))?;
        }

        let (written, blocks) = timed.value;
        debug!(file_size, elapsed = ?timed.elapsed, "sequential write file done");
        Ok(BenchmarkResult::new(
            Operation::SequentialWrite,
            file_size,
            written,
            blocks,
            timed.elapsed,
        ))
    }

    /// Prepare a file of `file_size` bytes (untimed), evict it from the page
    /// cache, then time reading it back to EOF.
    pub fn read_file(&mut self, file_size: u64) -> Result<BenchmarkResult> {
        let block = self.generator.data(self.block_size as usize);
        let mut temp_file = self.scratch.temp_file(READ_FILE);
        if self.keep_files {
            temp_file.keep_on_drop();
        }
        let path = temp_file.path().to_path_buf();

        {
            let mut file = self
                .disk_io
                .create_write(&path)
                .map_err(|e| io_context("creating sequential read file", e))?;
            let mut written = 0u64;
            while written < file_size {
                let chunk = std::cmp::min(file_size - written, self.block_size) as usize;
                file.write_all(&block[..chunk])
                    .map_err(|e| io_context("preparing sequential read file", e))?;
                written += chunk as u64;
            }
            self.disk_io
                .sync(&file)
                .map_err(|e| io_context("syncing sequential read file", e))?;
        }

        let cold = self
            .disk_io
            .open_read(&path)
            .map_err(|e| io_context("opening sequential read file", e))?;
        if let Err(e) = self.disk_io.drop_cache(&cold) {
            debug!(error = %e, "page cache eviction not available");
        }
        drop(cold);

        let mut buffer = vec![0u8; self.block_size as usize];
        let disk_io = &self.disk_io;
        let timed = timer::time(|| {
            let mut file = disk_io
                .open_read(&path)
                .map_err(|e| io_context("opening sequential read file", e))?;
            let mut read = 0u64;
            let mut blocks = 0u64;
            loop {
                let n = file
                    .read(&mut buffer)
                    .map_err(|e| io_context(&format!("reading at byte {}", read), e))?;
                if n == 0 {
                    break;
                }
                read += n as u64;
                blocks += 1;
            }
            Ok((read, blocks))
        })?;

        if !self.keep_files {
            temp_file
                .remove()
                .map_err(|e| io_context("removing sequential read file", e))?;
        }

        let (read, blocks) = timed.value;
        debug!(file_size, read, elapsed = ?timed.elapsed, "sequential read file done");
        Ok(BenchmarkResult::new(
            Operation::SequentialRead,
            file_size,
            read,
            blocks,
            timed.elapsed,
        ))
    }

    /// Write `total` bytes as files of `file_size` bytes
    pub fn write_tier(
        &mut self,
        total: u64,
        file_size: u64,
        progress: &ProgressBar,
    ) -> Result<ThroughputOutcome> {
        let runs = timer::run_timed(file_count(total, file_size) as usize, |i| {
            let trial = self.write_file(planned_size(total, file_size, i as u64))?;
            progress.inc(trial.bytes);
            Ok(trial)
        })?;
        let trials = runs.into_iter().map(|run| run.value).collect();
        Ok(ThroughputOutcome::from_trials(file_size, trials))
    }

    /// Read `total` bytes as files of `file_size` bytes
    pub fn read_tier(
        &mut self,
        total: u64,
        file_size: u64,
        progress: &ProgressBar,
    ) -> Result<ThroughputOutcome> {
        let runs = timer::run_timed(file_count(total, file_size) as usize, |i| {
            let trial = self.read_file(planned_size(total, file_size, i as u64))?;
            progress.inc(trial.bytes);
            Ok(trial)
        })?;
        let trials = runs.into_iter().map(|run| run.value).collect();
        Ok(ThroughputOutcome::from_trials(file_size, trials))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const KIB: u64 = 1024;

    fn plan(total: u64, file_size: u64) -> Vec<u64> {
        file_plan(total, file_size).collect()
    }

    #[test]
    fn test_file_plan_exact_division() {
        assert_eq!(plan(4 * KIB, KIB), vec![KIB; 4]);
        assert_eq!(file_count(4 * KIB, KIB), 4);
    }

    #[test]
    fn test_file_plan_keeps_remainder() {
        let sizes = plan(1000, 300);
        assert_eq!(sizes, vec![300, 300, 300, 100]);
        assert_eq!(sizes.iter().sum::<u64>(), 1000);
        assert_eq!(file_count(1000, 300), 4);
    }

    #[test]
    fn test_file_plan_size_larger_than_total() {
        assert_eq!(plan(100, 4096), vec![100]);
        assert!(plan(100, 0).is_empty());
        assert!(plan(0, 10).is_empty());
        assert_eq!(file_count(100, 0), 0);
    }

    #[test]
    fn test_file_count_for_huge_tier_is_arithmetic() {
        let total = 100 * 1024 * 1024 * 1024;
        assert_eq!(file_count(total, 512), total / 512);
        assert_eq!(file_plan(total, 512).take(3).collect::<Vec<_>>(), vec![512; 3]);
        assert_eq!(file_plan(10 * 512 + 7, 512).last(), Some(7));
    }

    #[test]
    fn test_sequential_write_file() {
        let temp_dir = tempdir().unwrap();
        let scratch = ScratchDir::create(&temp_dir.path().join("scratch"), false).unwrap();
        let mut bench = SequentialBenchmark::new(&scratch, 64 * KIB);

        let result = bench.write_file(1024 * KIB).unwrap();
        assert_eq!(result.operation, Operation::SequentialWrite);
        assert_eq!(result.bytes, 1024 * KIB);
        assert_eq!(result.operations, 16);
        assert!(result.throughput_bps >= 0.0);
        assert!(!scratch.join(WRITE_FILE).exists());
    }

    #[test]
    fn test_sequential_write_partial_block() {
        let temp_dir = tempdir().unwrap();
        let scratch = ScratchDir::create(&temp_dir.path().join("scratch"), false).unwrap();
        let mut bench = SequentialBenchmark::new(&scratch, 4 * KIB).keep_files(true);

        let result = bench.write_file(10 * KIB + 5).unwrap();
        assert_eq!(result.bytes, 10 * KIB + 5);
        assert_eq!(result.operations, 3);
        let len = std::fs::metadata(scratch.join(WRITE_FILE)).unwrap().len();
        assert_eq!(len, 10 * KIB + 5);
    }

    #[test]
    fn test_sequential_read_file() {
        let temp_dir = tempdir().unwrap();
        let scratch = ScratchDir::create(&temp_dir.path().join("scratch"), false).unwrap();
        let mut bench = SequentialBenchmark::new(&scratch, 64 * KIB);

        let result = bench.read_file(512 * KIB).unwrap();
        assert_eq!(result.operation, Operation::SequentialRead);
        assert_eq!(result.bytes, 512 * KIB);
        assert_eq!(result.operations, 8);
        assert!(!scratch.join(READ_FILE).exists());
    }

    #[test]
    fn test_write_tier_total_bytes_equals_data_size() {
        let temp_dir = tempdir().unwrap();
        let scratch = ScratchDir::create(&temp_dir.path().join("scratch"), false).unwrap();
        let mut bench = SequentialBenchmark::new(&scratch, 4 * KIB);
        let total = 100 * KIB + 17;

        let outcome = bench
            .write_tier(total, 30 * KIB, &ProgressBar::hidden())
            .unwrap();
        assert_eq!(outcome.total_bytes, total);
        assert_eq!(outcome.num_files, 4);
        assert_eq!(outcome.trials.iter().map(|t| t.bytes).sum::<u64>(), total);
        assert!(outcome.speed_bytes_per_sec >= 0.0);
        assert!(outcome.duration_sec >= 0.0);
    }

    #[test]
    fn test_read_tier_reads_everything() {
        let temp_dir = tempdir().unwrap();
        let scratch = ScratchDir::create(&temp_dir.path().join("scratch"), false).unwrap();
        let mut bench = SequentialBenchmark::new(&scratch, 4 * KIB);
        let progress = ProgressBar::hidden();

        let outcome = bench.read_tier(64 * KIB, 16 * KIB, &progress).unwrap();
        assert_eq!(outcome.total_bytes, 64 * KIB);
        assert_eq!(outcome.num_files, 4);
        assert_eq!(progress.position(), 64 * KIB);
    }
}
