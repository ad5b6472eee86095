//! I/O operations module
//!
//! Host file operations behind the `DiskIO` trait, scratch space
//! management and synthetic workload generation.

pub mod buffer;
pub mod disk;

pub use buffer::WorkloadGenerator;
pub use disk::{
    copy_files, create_disk_io, dir_size, DiskIO, PlatformDiskIO, ScratchDir, TempFile,
    SCRATCH_DIR_NAME,
};
