//! Cross-run statistics
//!
//! Mean and sample standard deviation of every numeric metric, per test,
//! computed once all runs have finished.

use crate::models::result::RunResults;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// test name -> metric name -> statistics
pub type AggregatedStatistics = BTreeMap<String, BTreeMap<String, AggregatedStat>>;

/// Summary of one metric of one test across all runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedStat {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Per-run values in run order
    pub values: Vec<f64>,
}

impl AggregatedStat {
    pub fn from_values(values: Vec<f64>) -> Self {
        if values.is_empty() {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
                values,
            };
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            mean: mean(&values),
            std_dev: sample_std_dev(&values),
            min,
            max,
            values,
        }
    }

    /// Standard deviation relative to the mean, 0 when the mean is 0
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean == 0.0 {
            0.0
        } else {
            self.std_dev / self.mean.abs()
        }
    }
}

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample (n - 1) standard deviation, 0 with fewer than two values
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Collect every metric of every test across the runs and summarise it
pub fn aggregate_runs(runs: &[RunResults]) -> AggregatedStatistics {
    let mut collected: BTreeMap<String, BTreeMap<String, Vec<f64>>> = BTreeMap::new();

    for run in runs {
        for record in &run.tests {
            let metrics = collected.entry(record.name.clone()).or_default();
            for (metric, value) in record.outcome.metrics() {
                metrics.entry(metric.to_string()).or_default().push(value);
            }
        }
    }

    collected
        .into_iter()
        .map(|(test, metrics)| {
            let stats = metrics
                .into_iter()
                .map(|(metric, values)| (metric, AggregatedStat::from_values(values)))
                .collect();
            (test, stats)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::result::{
        BenchmarkResult, MetadataOutcome, Operation, TestOutcome,
    };
    use std::time::Duration;

    fn creation_run(run: usize, files: u64, millis: u64) -> RunResults {
        let trial = BenchmarkResult::new(
            Operation::FileCreate,
            4096,
            files * 4096,
            files,
            Duration::from_millis(millis),
        );
        let mut results = RunResults::new(run);
        results.push(
            "file_creation",
            TestOutcome::FileCreation(MetadataOutcome::from_trial(&trial)),
        );
        results
    }

    #[test]
    fn test_mean_and_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values) - 5.0).abs() < 1e-12);
        // sample variance = 32 / 7
        assert!((sample_std_dev(&values) - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(sample_std_dev(&[]), 0.0);
        assert_eq!(sample_std_dev(&[42.0]), 0.0);

        let stat = AggregatedStat::from_values(vec![]);
        assert_eq!(stat.mean, 0.0);
        assert_eq!(stat.max, 0.0);
    }

    #[test]
    fn test_aggregated_stat_min_max() {
        let stat = AggregatedStat::from_values(vec![3.0, 1.0, 2.0]);
        assert_eq!(stat.min, 1.0);
        assert_eq!(stat.max, 3.0);
        assert_eq!(stat.values, vec![3.0, 1.0, 2.0]);
        assert!((stat.mean - 2.0).abs() < 1e-12);
        assert!((stat.std_dev - 1.0).abs() < 1e-12);
        assert!((stat.coefficient_of_variation() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_aggregate_runs_mean_matches_run_values() {
        let runs = vec![
            creation_run(1, 100, 100),
            creation_run(2, 100, 200),
            creation_run(3, 100, 400),
        ];

        let aggregated = aggregate_runs(&runs);
        let rate = &aggregated["file_creation"]["files_per_sec"];
        assert_eq!(rate.values.len(), 3);

        let expected = (1000.0 + 500.0 + 250.0) / 3.0;
        assert!((rate.mean - expected).abs() < 1e-9);

        let files = &aggregated["file_creation"]["files"];
        assert_eq!(files.mean, 100.0);
        assert_eq!(files.std_dev, 0.0);
    }

    #[test]
    fn test_aggregate_runs_tolerates_missing_tests() {
        let mut second = creation_run(2, 10, 10);
        second.tests.clear();
        let aggregated = aggregate_runs(&[creation_run(1, 10, 10), second]);
        assert_eq!(aggregated["file_creation"]["files"].values.len(), 1);
    }
}
