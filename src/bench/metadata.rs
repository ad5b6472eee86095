//! Metadata benchmark operations
//!
//! Small-file creation and deletion rates inside the scratch directory.

use crate::bench::timer;
use crate::error::io_context;
use crate::io::buffer::WorkloadGenerator;
use crate::io::disk::{create_disk_io, DiskIO, PlatformDiskIO, ScratchDir};
use crate::models::{BenchmarkResult, MetadataOutcome, Operation};
use crate::Result;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

const FILE_PREFIX: &str = "small_file_";
const FILE_SUFFIX: &str = ".bin";

fn small_file_name(index: usize) -> String {
    format!("{}{}{}", FILE_PREFIX, index, FILE_SUFFIX)
}

fn is_small_file(name: &str) -> bool {
    name.strip_prefix(FILE_PREFIX)
        .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

/// Metadata benchmark executor
pub struct MetadataBenchmark<'a> {
    scratch: &'a ScratchDir,
    disk_io: PlatformDiskIO,
    generator: WorkloadGenerator,
}

impl<'a> MetadataBenchmark<'a> {
    pub fn new(scratch: &'a ScratchDir) -> Self {
        Self {
            scratch,
            disk_io: create_disk_io(),
            generator: WorkloadGenerator::new(),
        }
    }

    /// Create `num_files` files of `file_size` bytes, all sharing one buffer
    pub fn create_files(&mut self, num_files: usize, file_size: u64) -> Result<MetadataOutcome> {
        let data = self.generator.data(file_size as usize);
        let paths: Vec<PathBuf> = (0..num_files)
            .map(|i| self.scratch.join(small_file_name(i)))
            .collect();
        let disk_io = &self.disk_io;

        let timed = timer::time(|| {
            for path in &paths {
                let mut file = disk_io
                    .create_write(path)
                    .map_err(|e| io_context(&format!("creating {}", path.display()), e))?;
                file.write_all(&data)
                    .map_err(|e| io_context(&format!("writing {}", path.display()), e))?;
            }
            Ok(())
        })?;

        let trial = BenchmarkResult::new(
            Operation::FileCreate,
            file_size,
            num_files as u64 * file_size,
            num_files as u64,
            timed.elapsed,
        );
        debug!(num_files, files_per_sec = trial.iops, "file creation done");
        Ok(MetadataOutcome::from_trial(&trial))
    }

    /// Delete every `small_file_<n>.bin` in the scratch directory.
    /// The count is the number of files found, not the number requested.
    pub fn delete_files(&mut self) -> Result<MetadataOutcome> {
        let mut paths = Vec::new();
        let entries = fs::read_dir(self.scratch.path())
            .map_err(|e| io_context("listing scratch directory", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_context("listing scratch directory", e))?;
            if entry.file_name().to_str().is_some_and(is_small_file) {
                paths.push(entry.path());
            }
        }

        let file_size = match paths.first() {
            Some(path) => fs::metadata(path).map(|m| m.len()).unwrap_or(0),
            None => 0,
        };

        let timed = timer::time(|| {
            for path in &paths {
                fs::remove_file(path)
                    .map_err(|e| io_context(&format!("deleting {}", path.display()), e))?;
            }
            Ok(())
        })?;

        let trial = BenchmarkResult::new(
            Operation::FileDelete,
            file_size,
            0,
            paths.len() as u64,
            timed.elapsed,
        );
        debug!(files = paths.len(), files_per_sec = trial.iops, "file deletion done");
        Ok(MetadataOutcome::from_trial(&trial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_small_file_names() {
        assert_eq!(small_file_name(42), "small_file_42.bin");
        assert!(is_small_file("small_file_0.bin"));
        assert!(!is_small_file("small_file_.bin"));
        assert!(!is_small_file("small_file_1.tmp"));
        assert!(!is_small_file("sequential_write_test.bin"));
    }

    #[test]
    fn test_create_then_delete_removes_every_file() {
        let temp_dir = tempdir().unwrap();
        let scratch = ScratchDir::create(&temp_dir.path().join("scratch"), false).unwrap();
        let mut bench = MetadataBenchmark::new(&scratch);

        let created = bench.create_files(50, 512).unwrap();
        assert_eq!(created.files, 50);
        assert_eq!(created.file_size, 512);
        assert!(created.files_per_sec >= 0.0);
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 50);
        assert_eq!(fs::metadata(scratch.join("small_file_7.bin")).unwrap().len(), 512);

        let deleted = bench.delete_files().unwrap();
        assert_eq!(deleted.files, 50);
        assert_eq!(deleted.file_size, 512);
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_delete_counts_only_existing_files() {
        let temp_dir = tempdir().unwrap();
        let scratch = ScratchDir::create(&temp_dir.path().join("scratch"), false).unwrap();
        let mut bench = MetadataBenchmark::new(&scratch);

        bench.create_files(10, 16).unwrap();
        fs::remove_file(scratch.join("small_file_3.bin")).unwrap();
        fs::write(scratch.join("unrelated.bin"), b"keep").unwrap();

        let deleted = bench.delete_files().unwrap();
        assert_eq!(deleted.files, 9);
        assert!(scratch.join("unrelated.bin").exists());
    }

    #[test]
    fn test_delete_with_nothing_to_delete() {
        let temp_dir = tempdir().unwrap();
        let scratch = ScratchDir::create(&temp_dir.path().join("scratch"), false).unwrap();
        let mut bench = MetadataBenchmark::new(&scratch);

        let deleted = bench.delete_files().unwrap();
        assert_eq!(deleted.files, 0);
        assert_eq!(deleted.avg_time_per_file_ms, 0.0);
    }
}
