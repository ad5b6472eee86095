//! Results persistence module
//!
//! Handles saving and loading of benchmark reports as pretty-printed JSON,
//! and collecting a folder of saved reports for comparison.

use crate::models::BenchmarkReport;
use crate::{FsPerfError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Report file on disk
#[derive(Debug)]
pub struct ReportStorage {
    report_path: PathBuf,
}

impl ReportStorage {
    pub fn new(report_path: impl Into<PathBuf>) -> Self {
        Self {
            report_path: report_path.into(),
        }
    }

    /// Write the report, replacing any previous file at the same path
    pub fn save(&self, report: &BenchmarkReport) -> Result<()> {
        if let Some(parent) = self.report_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    FsPerfError::PersistenceError(format!(
                        "Failed to create results directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(report)?;

        fs::write(&self.report_path, content).map_err(|e| {
            FsPerfError::PersistenceError(format!(
                "Failed to write results file {}: {}",
                self.report_path.display(),
                e
            ))
        })?;

        Ok(())
    }

    pub fn load(&self) -> Result<BenchmarkReport> {
        let content = fs::read_to_string(&self.report_path).map_err(|e| {
            FsPerfError::PersistenceError(format!(
                "Failed to read results file {}: {}",
                self.report_path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            FsPerfError::PersistenceError(format!(
                "Failed to parse results file {}: {}",
                self.report_path.display(),
                e
            ))
        })
    }

    pub fn path(&self) -> &Path {
        &self.report_path
    }
}

/// Load every `*.json` report in `dir`, labelled by file stem and sorted by label.
/// Files that fail to parse are skipped with a warning.
pub fn load_reports_in_dir(dir: &Path) -> Result<Vec<(String, BenchmarkReport)>> {
    if !dir.is_dir() {
        return Err(FsPerfError::PersistenceError(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut reports = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        match ReportStorage::new(&path).load() {
            Ok(report) => reports.push((label, report)),
            Err(e) => warn!(file = %path.display(), error = %e, "skipping unreadable report"),
        }
    }

    reports.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(reports)
}
