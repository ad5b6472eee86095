use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Host file operations used by the benchmarks
pub trait DiskIO {
    /// Create (or truncate) a file for writing
    fn create_write(&self, path: &Path) -> io::Result<File>;

    /// Open an existing file for reading
    fn open_read(&self, path: &Path) -> io::Result<File>;

    /// Open an existing file for in-place reads and writes
    fn open_read_write(&self, path: &Path) -> io::Result<File>;

    /// Force data and metadata to stable storage
    fn sync(&self, file: &File) -> io::Result<()> {
        file.sync_all()
    }

    /// Ask the OS to evict the file's pages from its cache.
    /// Best effort: platforms without an API return Ok.
    fn drop_cache(&self, file: &File) -> io::Result<()>;
}

/// File removed when dropped unless told to stay
pub struct TempFile {
    path: PathBuf,
    cleanup_on_drop: bool,
}

impl TempFile {
    pub fn new(path: PathBuf, cleanup: bool) -> Self {
        Self {
            path,
            cleanup_on_drop: cleanup,
        }
    }

    /// Disable automatic cleanup (for debugging)
    pub fn keep_on_drop(&mut self) {
        self.cleanup_on_drop = false;
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file now, surfacing any error
    pub fn remove(mut self) -> io::Result<()> {
        self.cleanup_on_drop = false;
        fs::remove_file(&self.path)
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.cleanup_on_drop {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Name of the directory fsperf owns inside the chosen test directory
pub const SCRATCH_DIR_NAME: &str = "fsperf_scratch";

/// Scratch space for one run: `<parent>/fsperf_scratch`, recreated empty
/// and removed on drop. Nothing else under `parent` is touched; `parent`
/// itself is removed only if this created it and it is left empty.
pub struct ScratchDir {
    path: PathBuf,
    created_parent: Option<PathBuf>,
    cleanup_on_drop: bool,
}

impl ScratchDir {
    pub fn create(parent: &Path, keep: bool) -> io::Result<Self> {
        let created_parent = if parent.exists() {
            None
        } else {
            fs::create_dir_all(parent)?;
            Some(parent.to_path_buf())
        };

        let path = parent.join(SCRATCH_DIR_NAME);
        if path.exists() {
            fs::remove_dir_all(&path)?;
        }
        fs::create_dir(&path)?;

        Ok(Self {
            path,
            created_parent,
            cleanup_on_drop: !keep,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Temp file inside the scratch directory
    pub fn temp_file(&self, name: &str) -> TempFile {
        TempFile::new(self.join(name), self.cleanup_on_drop)
    }

    /// Create a fresh sub-directory, e.g. for an install target
    pub fn subdir(&self, name: &str) -> io::Result<PathBuf> {
        let dir = self.join(name);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.cleanup_on_drop {
            let _ = fs::remove_dir_all(&self.path);
            if let Some(parent) = &self.created_parent {
                // fails, and keeps the directory, unless it is empty
                let _ = fs::remove_dir(parent);
            }
        }
    }
}

/// Platform-specific disk I/O implementation
#[derive(Clone, Default)]
pub struct PlatformDiskIO;

impl PlatformDiskIO {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
mod unix_impl {
    use super::*;
    use std::os::unix::io::AsRawFd;

    impl DiskIO for PlatformDiskIO {
        fn create_write(&self, path: &Path) -> io::Result<File> {
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)
        }

        fn open_read(&self, path: &Path) -> io::Result<File> {
            OpenOptions::new().read(true).open(path)
        }

        fn open_read_write(&self, path: &Path) -> io::Result<File> {
            OpenOptions::new().read(true).write(true).open(path)
        }

        #[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
        fn drop_cache(&self, file: &File) -> io::Result<()> {
            // Dirty pages are not evicted, so flush first.
            file.sync_all()?;
            // SAFETY: the fd is owned by `file` and open for the duration of the call.
            let rc = unsafe {
                libc::posix_fadvise(file.as_raw_fd(), 0, 0, libc::POSIX_FADV_DONTNEED)
            };
            if rc != 0 {
                return Err(io::Error::from_raw_os_error(rc));
            }
            Ok(())
        }

        #[cfg(target_os = "macos")]
        fn drop_cache(&self, file: &File) -> io::Result<()> {
            file.sync_all()?;
            // SAFETY: the fd is owned by `file`; F_NOCACHE only toggles caching for it.
            let rc = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_NOCACHE, 1) };
            if rc == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }

        #[cfg(not(any(
            target_os = "linux",
            target_os = "android",
            target_os = "freebsd",
            target_os = "macos"
        )))]
        fn drop_cache(&self, file: &File) -> io::Result<()> {
            file.sync_all()
        }
    }
}

#[cfg(windows)]
mod windows_impl {
    use super::*;

    impl DiskIO for PlatformDiskIO {
        fn create_write(&self, path: &Path) -> io::Result<File> {
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)
        }

        fn open_read(&self, path: &Path) -> io::Result<File> {
            OpenOptions::new().read(true).open(path)
        }

        fn open_read_write(&self, path: &Path) -> io::Result<File> {
            OpenOptions::new().read(true).write(true).open(path)
        }

        fn drop_cache(&self, file: &File) -> io::Result<()> {
            file.sync_all()
        }
    }
}

/// Total size of the regular files under `path`, symlinks not followed
pub fn dir_size(path: &Path) -> io::Result<u64> {
    let mut total = 0;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

/// Copy the regular files of `src` (not recursing) into `dst`
pub fn copy_files(src: &Path, dst: &Path, names: &[&str]) -> io::Result<usize> {
    let mut copied = 0;
    for name in names {
        let from = src.join(name);
        if from.is_file() {
            fs::copy(&from, dst.join(name))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Create a new platform-specific disk I/O instance
pub fn create_disk_io() -> PlatformDiskIO {
    PlatformDiskIO::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use tempfile::tempdir;

    #[test]
    fn test_temp_file_cleanup() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("t.bin");
        fs::write(&path, b"data").unwrap();

        let temp_file = TempFile::new(path.clone(), true);
        assert!(temp_file.path().exists());
        drop(temp_file);
        assert!(!path.exists());
    }

    #[test]
    fn test_temp_file_keep_on_drop() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("t.bin");
        fs::write(&path, b"data").unwrap();

        let mut temp_file = TempFile::new(path.clone(), true);
        temp_file.keep_on_drop();
        drop(temp_file);
        assert!(path.exists());
    }

    #[test]
    fn test_temp_file_remove_reports_missing_file() {
        let temp_dir = tempdir().unwrap();
        let temp_file = TempFile::new(temp_dir.path().join("never-created"), true);
        assert!(temp_file.remove().is_err());
    }

    #[test]
    fn test_scratch_dir_is_recreated_empty_and_removed() {
        let temp_dir = tempdir().unwrap();
        let parent = temp_dir.path().join("bench");
        let stale = parent.join(SCRATCH_DIR_NAME);
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("leftover"), b"x").unwrap();

        let scratch = ScratchDir::create(&parent, false).unwrap();
        assert_eq!(scratch.path(), stale.as_path());
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
        drop(scratch);
        assert!(!stale.exists());
        // existed before, so it stays
        assert!(parent.exists());
    }

    #[test]
    fn test_scratch_dir_removes_parent_it_created() {
        let temp_dir = tempdir().unwrap();
        let parent = temp_dir.path().join("fresh");

        let scratch = ScratchDir::create(&parent, false).unwrap();
        fs::write(scratch.join("data.bin"), b"x").unwrap();
        drop(scratch);
        assert!(!parent.exists());
    }

    #[test]
    fn test_scratch_dir_leaves_existing_files_alone() {
        let temp_dir = tempdir().unwrap();
        let mount = temp_dir.path().join("mnt");
        fs::create_dir_all(mount.join("photos")).unwrap();
        fs::write(mount.join("photos/wedding.jpg"), b"jpeg").unwrap();
        fs::write(mount.join("notes.txt"), b"keep me").unwrap();

        let scratch = ScratchDir::create(&mount, false).unwrap();
        fs::write(scratch.join("sequential_write_test.bin"), b"x").unwrap();
        drop(scratch);

        assert!(mount.join("photos/wedding.jpg").exists());
        assert!(mount.join("notes.txt").exists());
        assert!(!mount.join(SCRATCH_DIR_NAME).exists());
    }

    #[test]
    fn test_scratch_dir_keep() {
        let temp_dir = tempdir().unwrap();
        let parent = temp_dir.path().join("scratch");
        let scratch = ScratchDir::create(&parent, true).unwrap();
        let kept = scratch.temp_file("kept.bin");
        fs::write(kept.path(), b"x").unwrap();
        drop(kept);
        drop(scratch);
        assert!(parent.join(SCRATCH_DIR_NAME).join("kept.bin").exists());
    }

    #[test]
    fn test_write_read_and_drop_cache() {
        let temp_dir = tempdir().unwrap();
        let disk_io = create_disk_io();
        let path = temp_dir.path().join("io.bin");

        let mut file = disk_io.create_write(&path).unwrap();
        file.write_all(&[7u8; 8192]).unwrap();
        disk_io.sync(&file).unwrap();
        drop(file);

        let mut file = disk_io.open_read(&path).unwrap();
        disk_io.drop_cache(&file).unwrap();
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).unwrap();
        assert_eq!(buf.len(), 8192);
        assert!(buf.iter().all(|&b| b == 7));
    }

    #[test]
    fn test_dir_size_recurses() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a"), vec![0u8; 100]).unwrap();
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        fs::write(root.join("sub/b"), vec![0u8; 20]).unwrap();
        fs::write(root.join("sub/deeper/c"), vec![0u8; 3]).unwrap();
        assert_eq!(dir_size(root).unwrap(), 123);
    }

    #[test]
    fn test_copy_files_skips_missing() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        fs::write(src.path().join("package.json"), b"{}").unwrap();
        let copied = copy_files(src.path(), dst.path(), &["package.json", "package-lock.json"]).unwrap();
        assert_eq!(copied, 1);
        assert!(dst.path().join("package.json").exists());
        assert!(!dst.path().join("package-lock.json").exists());
    }

    #[test]
    fn test_open_read_missing_file_fails() {
        let temp_dir = tempdir().unwrap();
        let disk_io = PlatformDiskIO::new();
        let err = disk_io.open_read(&temp_dir.path().join("missing")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
