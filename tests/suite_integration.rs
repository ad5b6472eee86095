use fsperf::bench::BenchmarkSuite;
use fsperf::config::persistence::{load_reports_in_dir, ReportStorage};
use fsperf::config::{BenchmarkConfig, RandomConfig, RandomTest};
use fsperf::models::stats::mean;
use fsperf::models::{Section, TestOutcome};
use fsperf::report;
use std::path::Path;

const KIB: u64 = 1024;

fn small_config(root: &Path) -> BenchmarkConfig {
    BenchmarkConfig::default()
        .with_test_dir(root.join("benchmark_temp"))
        .with_data_size(300 * KIB)
        .with_num_runs(3)
        .with_block_size(32 * KIB)
        .with_file_sizes(vec![32 * KIB, 128 * KIB])
        .with_random(RandomConfig {
            block_size: 4 * KIB,
            tests: vec![
                RandomTest { file_size: 64 * KIB, operations: 40 },
                RandomTest { file_size: 256 * KIB, operations: 80 },
            ],
        })
        .with_metadata(30, 4 * KIB)
        .with_real_world(false)
        .with_output(root.join("benchmark_results.json"))
}

#[tokio::test]
async fn test_full_suite_produces_consistent_report() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = small_config(temp_dir.path());
    let suite = BenchmarkSuite::new(config.clone()).unwrap().with_console(false);

    let report = suite.run_report().await.unwrap();
    assert_eq!(report.num_runs, 3);
    assert!(!config.test_dir.exists());

    for run in &report.all_runs {
        assert_eq!(run.len(), 10);
        for record in &run.tests {
            let outcome = &record.outcome;
            assert!(outcome.duration_sec() >= 0.0, "{} has negative duration", record.name);
            for (metric, value) in outcome.metrics() {
                assert!(value >= 0.0, "{}.{} is negative", record.name, metric);
            }
            assert_eq!(Section::of_test(&record.name), Some(outcome.section()));

            if let TestOutcome::SequentialWrite(o) = outcome {
                assert_eq!(o.total_bytes, config.data_size);
                assert_eq!(o.trials.iter().map(|t| t.bytes).sum::<u64>(), config.data_size);
            }
        }
    }

    for (test, metrics) in &report.aggregated_statistics {
        for (metric, stat) in metrics {
            assert_eq!(stat.values.len(), 3, "{}.{}", test, metric);
            let expected = mean(&stat.values);
            assert!(
                (stat.mean - expected).abs() <= 1e-9 * expected.abs().max(1.0),
                "{}.{} mean mismatch",
                test,
                metric
            );
            assert!(stat.min <= stat.mean && stat.mean <= stat.max);
            assert!(stat.std_dev >= 0.0);
        }
    }

    let text = report::aggregated_report(&report.aggregated_statistics, report.num_runs);
    assert!(text.contains("SEQUENTIAL READ PERFORMANCE"));
    assert!(text.contains("METADATA OPERATIONS"));
    assert!(!text.contains("REAL-WORLD WORKLOADS"));
}

#[tokio::test]
async fn test_report_round_trips_and_compares() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = small_config(temp_dir.path()).with_num_runs(1);
    let suite = BenchmarkSuite::new(config.clone()).unwrap().with_console(false);
    let report = suite.run_report().await.unwrap();

    let graph_data = temp_dir.path().join("graph_data");
    ReportStorage::new(graph_data.join("first.json")).save(&report).unwrap();
    ReportStorage::new(graph_data.join("second.json")).save(&report).unwrap();

    let loaded = ReportStorage::new(graph_data.join("first.json")).load().unwrap();
    assert_eq!(loaded.config, config);
    assert_eq!(loaded.all_runs.len(), 1);
    let names: Vec<&str> = loaded.all_runs[0].tests.iter().map(|t| t.name.as_str()).collect();
    let expected: Vec<&str> = report.all_runs[0].tests.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, expected);

    let reports = load_reports_in_dir(&graph_data).unwrap();
    assert_eq!(reports.len(), 2);
    let table = report::comparison_table(&reports);
    assert!(table.lines().next().unwrap().contains("first"));
    assert!(table.contains("seq_write_32768"));
    assert!(table.contains("file_deletion"));
}
