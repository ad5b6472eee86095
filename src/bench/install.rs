//! Real-world install workloads
//!
//! Times `npm install` and `pip install` against offline caches primed by
//! `fsperf setup-cache`, so the measurement is dominated by the many small
//! file writes an install performs rather than by the network.

use crate::config::RealWorldConfig;
use crate::io::disk::{copy_files, dir_size, ScratchDir};
use crate::models::{InstallOutcome, PackageManager};
use crate::util::units::format_duration;
use crate::{FsPerfError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};

const NPM_MANIFESTS: [&str; 2] = ["package.json", "package-lock.json"];

/// Where the offline caches live under the cache root
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn npm_dir(&self) -> PathBuf {
        self.root.join("npm")
    }

    pub fn npm_manifest(&self) -> PathBuf {
        self.npm_dir().join("package.json")
    }

    pub fn npm_cache(&self) -> PathBuf {
        self.npm_dir().join("cache")
    }

    pub fn pip_dir(&self) -> PathBuf {
        self.root.join("pip")
    }

    pub fn pip_requirements(&self) -> PathBuf {
        self.pip_dir().join("requirements.txt")
    }

    pub fn pip_wheels(&self) -> PathBuf {
        self.pip_dir().join("wheels")
    }

    pub fn npm_ready(&self) -> bool {
        self.npm_manifest().is_file() && self.npm_cache().is_dir()
    }

    pub fn pip_ready(&self) -> bool {
        self.pip_requirements().is_file() && self.pip_wheels().is_dir()
    }
}

fn npm_program() -> &'static str {
    if cfg!(windows) {
        "npm.cmd"
    } else {
        "npm"
    }
}

fn python_program() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(FsPerfError::from)
}

/// Whether `program args...` starts and exits successfully
pub async fn tool_available(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

async fn npm_available() -> bool {
    tool_available(npm_program(), &["--version"]).await
}

async fn pip_available() -> bool {
    tool_available(python_program(), &["-m", "pip", "--version"]).await
}

/// Run `cmd` to completion within `timeout`, returning the wall time.
/// Non-zero exit and timeout are errors; the child is killed on timeout.
pub async fn run_command(mut cmd: Command, what: &str, timeout: Duration) -> Result<Duration> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let child = cmd
        .spawn()
        .map_err(|e| FsPerfError::CommandError(format!("failed to start {}: {}", what, e)))?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output
            .map_err(|e| FsPerfError::CommandError(format!("waiting for {}: {}", what, e)))?,
        Err(_) => {
            return Err(FsPerfError::CommandError(format!(
                "{} timed out after {}",
                what,
                format_duration(timeout)
            )))
        }
    };
    let elapsed = start.elapsed();

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
        let tail: Vec<&str> = tail.into_iter().rev().collect();
        return Err(FsPerfError::CommandError(format!(
            "{} failed ({}): {}",
            what,
            output.status,
            tail.join(" | ")
        )));
    }

    debug!(command = what, ?elapsed, "command finished");
    Ok(elapsed)
}

/// Number of direct dependencies declared in a package.json
pub fn count_npm_packages(manifest: &Path) -> Result<u64> {
    let text = fs::read_to_string(manifest)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    let count: u64 = ["dependencies", "devDependencies"]
        .iter()
        .filter_map(|key| value.get(key).and_then(|deps| deps.as_object()))
        .map(|deps| deps.len() as u64)
        .sum();
    Ok(count)
}

/// Number of requirement lines, ignoring blanks, comments and options
pub fn count_requirements(requirements: &Path) -> Result<u64> {
    let text = fs::read_to_string(requirements)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('-'))
        .count() as u64)
}

/// Install workload executor
pub struct InstallBenchmark<'a> {
    scratch: &'a ScratchDir,
    cache: CacheLayout,
    timeout: Duration,
}

impl<'a> InstallBenchmark<'a> {
    pub fn new(scratch: &'a ScratchDir, config: &RealWorldConfig) -> Self {
        Self {
            scratch,
            cache: CacheLayout::new(&config.cache_dir),
            timeout: config.install_timeout(),
        }
    }

    /// Install the cached package.json into a fresh project.
    /// `None` when npm or its cache is missing.
    pub async fn npm_install(&self) -> Result<Option<InstallOutcome>> {
        if !self.cache.npm_ready() {
            warn!(cache = %self.cache.npm_dir().display(), "npm cache not found, skipping npm install");
            return Ok(None);
        }
        if !npm_available().await {
            warn!("npm not available, skipping npm install");
            return Ok(None);
        }

        let project = self.scratch.subdir("npm_project")?;
        copy_files(&self.cache.npm_dir(), &project, &NPM_MANIFESTS)?;

        let mut cmd = Command::new(npm_program());
        cmd.arg("install")
            .arg("--offline")
            .arg("--cache")
            .arg(absolute(&self.cache.npm_cache())?)
            .args(["--no-audit", "--no-fund", "--loglevel=error"])
            .current_dir(&project);

        info!("Running npm install");
        let elapsed = run_command(cmd, "npm install", self.timeout).await?;
        let node_modules = project.join("node_modules");
        let installed_bytes = if node_modules.is_dir() {
            dir_size(&node_modules)?
        } else {
            0
        };

        Ok(Some(InstallOutcome {
            manager: PackageManager::Npm,
            packages: count_npm_packages(&self.cache.npm_manifest())?,
            duration_sec: elapsed.as_secs_f64(),
            installed_bytes,
        }))
    }

    /// Install the cached requirements from local wheels into a fresh target.
    /// `None` when pip or its cache is missing.
    pub async fn pip_install(&self) -> Result<Option<InstallOutcome>> {
        if !self.cache.pip_ready() {
            warn!(cache = %self.cache.pip_dir().display(), "pip cache not found, skipping pip install");
            return Ok(None);
        }
        if !pip_available().await {
            warn!("pip not available, skipping pip install");
            return Ok(None);
        }

        let target = self.scratch.subdir("pip_target")?;

        let mut cmd = Command::new(python_program());
        cmd.args(["-m", "pip", "install", "--no-index", "--find-links"])
            .arg(absolute(&self.cache.pip_wheels())?)
            .arg("--target")
            .arg(absolute(&target)?)
            .arg("-r")
            .arg(absolute(&self.cache.pip_requirements())?)
            .args(["--quiet", "--disable-pip-version-check"]);

        info!("Running pip install");
        let elapsed = run_command(cmd, "pip install", self.timeout).await?;

        Ok(Some(InstallOutcome {
            manager: PackageManager::Pip,
            packages: count_requirements(&self.cache.pip_requirements())?,
            duration_sec: elapsed.as_secs_f64(),
            installed_bytes: dir_size(&target)?,
        }))
    }
}

/// Which caches `setup_cache` managed to prime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheSetupSummary {
    pub npm: bool,
    pub pip: bool,
}

/// Download the configured packages into the offline caches.
/// Needs network access; a manager that is missing or fails is reported, not fatal.
pub async fn setup_cache(config: &RealWorldConfig) -> Result<CacheSetupSummary> {
    let cache = CacheLayout::new(&config.cache_dir);
    fs::create_dir_all(cache.root())?;
    let timeout = config.install_timeout();

    let npm = if npm_available().await {
        match setup_npm_cache(&cache, &config.npm_packages, timeout).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "npm cache setup failed");
                false
            }
        }
    } else {
        warn!("npm not available, npm cache not created");
        false
    };

    let pip = if pip_available().await {
        match setup_pip_cache(&cache, &config.pip_packages, timeout).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "pip cache setup failed");
                false
            }
        }
    } else {
        warn!("pip not available, pip cache not created");
        false
    };

    Ok(CacheSetupSummary { npm, pip })
}

/// package.json depending on every package at its latest version
pub fn npm_manifest(packages: &[String]) -> serde_json::Value {
    let dependencies: serde_json::Map<String, serde_json::Value> = packages
        .iter()
        .map(|p| (p.clone(), serde_json::Value::String("*".to_string())))
        .collect();
    serde_json::json!({
        "name": "fsperf-cache",
        "version": "1.0.0",
        "private": true,
        "dependencies": dependencies,
    })
}

async fn setup_npm_cache(cache: &CacheLayout, packages: &[String], timeout: Duration) -> Result<()> {
    let npm_dir = cache.npm_dir();
    fs::create_dir_all(cache.npm_cache())?;
    fs::write(
        cache.npm_manifest(),
        serde_json::to_string_pretty(&npm_manifest(packages))?,
    )?;

    info!(packages = packages.len(), "Priming npm cache");
    let mut cmd = Command::new(npm_program());
    cmd.arg("install")
        .arg("--cache")
        .arg(absolute(&cache.npm_cache())?)
        .args(["--no-audit", "--no-fund", "--loglevel=error"])
        .current_dir(&npm_dir);
    run_command(cmd, "npm install (cache setup)", timeout).await?;

    // Only the cache and lockfile are needed afterwards.
    let node_modules = npm_dir.join("node_modules");
    if node_modules.exists() {
        fs::remove_dir_all(node_modules)?;
    }
    Ok(())
}

async fn setup_pip_cache(cache: &CacheLayout, packages: &[String], timeout: Duration) -> Result<()> {
    fs::create_dir_all(cache.pip_wheels())?;
    let mut requirements = packages.join("\n");
    requirements.push('\n');
    fs::write(cache.pip_requirements(), requirements)?;

    info!(packages = packages.len(), "Downloading pip wheels");
    let mut cmd = Command::new(python_program());
    cmd.args(["-m", "pip", "download", "--disable-pip-version-check", "--quiet", "-d"])
        .arg(absolute(&cache.pip_wheels())?)
        .arg("-r")
        .arg(absolute(&cache.pip_requirements())?);
    run_command(cmd, "pip download", timeout).await?;
    Ok(())
}
