//! Random read/write benchmark operations
//!
//! Fixed-count random I/O at block-aligned offsets, reported as IOPS and
//! latency.

use crate::bench::timer::{self, LatencyRecorder};
use crate::error::io_context;
use crate::io::buffer::WorkloadGenerator;
use crate::io::disk::{create_disk_io, DiskIO, PlatformDiskIO, ScratchDir};
use crate::models::{BenchmarkResult, IopsOutcome, LatencyStats, Operation};
use crate::Result;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::debug;

const WRITE_FILE: &str = "random_write_test.bin";
const READ_FILE: &str = "random_read_test.bin";
const FILL_CHUNK: usize = 1024 * 1024;

/// Random benchmark executor
pub struct RandomBenchmark<'a> {
    scratch: &'a ScratchDir,
    block_size: u64,
    disk_io: PlatformDiskIO,
    generator: WorkloadGenerator,
    keep_files: bool,
}

impl<'a> RandomBenchmark<'a> {
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

    /// Use a deterministic offset sequence
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.generator = WorkloadGenerator::seeded(seed);
        self
    }

    /// `operations` block writes at random offsets into a pre-allocated file
    pub fn random_write(&mut self, file_size: u64, operations: u64) -> Result<IopsOutcome> {
        let mut temp_file = self.scratch.temp_file(WRITE_FILE);
        if self.keep_files {
            temp_file.keep_on_drop();
        }
        let path = temp_file.path().to_path_buf();

        {
            let file = self
                .disk_io
                .create_write(&path)
                .map_err(|e| io_context("creating random write file", e))?;
            file.set_len(file_size)
                .map_err(|e| io_context("pre-allocating random write file", e))?;
        }

        let block = self.generator.data(self.block_size as usize);
        let offsets = self.offsets(file_size, operations);
        let mut latencies = LatencyRecorder::with_capacity(operations as usize);
        let disk_io = &self.disk_io;

        let timed = timer::time(|| {
            let mut file = disk_io
                .open_read_write(&path)
                .map_err(|e| io_context("opening random write file", e))?;
            for &offset in &offsets {
                latencies
                    .record(|| {
                        file.seek(SeekFrom::Start(offset))?;
                        file.write_all(&block)
                    })
                    .map_err(|e| io_context(&format!("writing at offset {}", offset), e))?;
            }
            file.flush()
                .map_err(|e| io_context("flushing random write file", e))?;
            disk_io
                .sync(&file)
                .map_err(|e| io_context("syncing random write file", e))?;
            Ok(())
        })?;

        if !self.keep_files {
            temp_file
                .remove()
                .map_err(|e| io_context("removing random write file", e))?;
        }

        let trial = BenchmarkResult::new(
            Operation::RandomWrite,
            file_size,
            operations * self.block_size,
            operations,
            timed.elapsed,
        );
        debug!(file_size, operations, iops = trial.iops, "random write done");
        Ok(IopsOutcome::new(
            &trial,
            self.block_size,
            LatencyStats::from_samples(latencies.samples()),
        ))
    }

    /// `operations` block reads at random offsets from a file of random data
    pub fn random_read(&mut self, file_size: u64, operations: u64) -> Result<IopsOutcome> {
        let mut temp_file = self.scratch.temp_file(READ_FILE);
        if self.keep_files {
            temp_file.keep_on_drop();
        }
        let path = temp_file.path().to_path_buf();
        self.fill_file(&path, file_size)?;

        let cold = self
            .disk_io
            .open_read(&path)
            .map_err(|e| io_context("opening random read file", e))?;
        if let Err(e) = self.disk_io.drop_cache(&cold) {
            debug!(error = %e, "page cache eviction not available");
        }
        drop(cold);

        let offsets = self.offsets(file_size, operations);
        let mut buffer = vec![0u8; self.block_size as usize];
        let mut latencies = LatencyRecorder::with_capacity(operations as usize);
        let disk_io = &self.disk_io;

        let timed = timer::time(|| {
            let mut file = disk_io
                .open_read(&path)
                .map_err(|e| io_context("opening random read file", e))?;
            for &offset in &offsets {
                latencies
                    .record(|| {
                        file.seek(SeekFrom::Start(offset))?;
                        file.read_exact(&mut buffer)
                    })
                    .map_err(|e| io_context(&format!("reading at offset {}", offset), e))?;
            }
            Ok(())
        })?;

        if !self.keep_files {
            temp_file
                .remove()
                .map_err(|e| io_context("removing random read file", e))?;
        }

        let trial = BenchmarkResult::new(
            Operation::RandomRead,
            file_size,
            operations * self.block_size,
            operations,
            timed.elapsed,
        );
        debug!(file_size, operations, iops = trial.iops, "random read done");
        Ok(IopsOutcome::new(
            &trial,
            self.block_size,
            LatencyStats::from_samples(latencies.samples()),
        ))
    }

    // Offsets are drawn before the timer starts so RNG cost is not measured.
    fn offsets(&mut self, file_size: u64, operations: u64) -> Vec<u64> {
        (0..operations)
            .map(|_| self.generator.aligned_offset(file_size, self.block_size))
            .collect()
    }

    fn fill_file(&mut self, path: &Path, file_size: u64) -> Result<()> {
        let chunk = self.generator.data(FILL_CHUNK);
        let mut file = self
            .disk_io
            .create_write(path)
            .map_err(|e| io_context("creating random read file", e))?;
        let mut written = 0u64;
        while written < file_size {
            let n = std::cmp::min(file_size - written, FILL_CHUNK as u64) as usize;
            file.write_all(&chunk[..n])
                .map_err(|e| io_context("filling random read file", e))?;
            written += n as u64;
        }
        self.disk_io
            .sync(&file)
            .map_err(|e| io_context("syncing random read file", e))?;
        Ok(())
    }
}
