//! Console reporting
//!
//! Per-test lines while a run progresses, the per-run summary, the
//! aggregated "mean ± std dev" table and the comparison of saved reports.
//! Formatting returns strings; the `print_*` wrappers write them to stdout.

use crate::models::{AggregatedStat, AggregatedStatistics, BenchmarkReport, RunResults, Section, TestOutcome};
use crate::util::units::{format_bytes, format_iops, format_latency, format_speed};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;

const WIDTH: usize = 70;

pub fn rule(c: char) -> String {
    c.to_string().repeat(WIDTH)
}

/// Byte-progress bar for a phase moving `total` bytes
pub fn progress_bar(total: u64, label: &str, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{spinner} {prefix:>14} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ");
    pb.set_style(style);
    pb.set_prefix(label.to_string());
    pb
}

/// Size encoded in a test name such as `seq_write_10485760`
pub fn test_size(name: &str) -> Option<u64> {
    name.rsplit('_').next().and_then(|s| s.parse().ok())
}

/// Section order first, then numeric file size, then name
fn test_order(name: &str) -> (Option<Section>, u64, String) {
    (Section::of_test(name), test_size(name).unwrap_or(0), name.to_string())
}

fn sorted_names<'a>(names: impl Iterator<Item = &'a String>) -> Vec<&'a String> {
    let mut names: Vec<&String> = names.collect();
    names.sort_by_key(|n| test_order(n));
    names
}

/// Lines describing one test outcome, as printed right after it runs
pub fn format_outcome(outcome: &TestOutcome) -> Vec<String> {
    match outcome {
        TestOutcome::SequentialWrite(o) | TestOutcome::SequentialRead(o) => {
            let verb = if matches!(outcome, TestOutcome::SequentialWrite(_)) {
                "Written"
            } else {
                "Read"
            };
            vec![
                format!("  Total Duration: {:.3} seconds", o.duration_sec),
                format!("  Average Speed: {}", o.speed_formatted),
                format!("  Files {}: {} ({})", verb, o.num_files, format_bytes(o.total_bytes as f64)),
            ]
        }
        TestOutcome::RandomWrite(o) | TestOutcome::RandomRead(o) => vec![
            format!("  Duration: {:.3} seconds", o.duration_sec),
            format!("  IOPS: {:.2}", o.iops),
            format!("  Avg Latency: {:.3} ms", o.avg_latency_ms),
            format!(
                "  Latency p50/p95/p99: {} / {} / {}",
                format_latency(o.latency.p50()),
                format_latency(o.latency.p95()),
                format_latency(o.latency.p99())
            ),
        ],
        TestOutcome::FileCreation(o) | TestOutcome::FileDeletion(o) => vec![
            format!("  Duration: {:.3} seconds", o.duration_sec),
            format!("  Files per second: {:.2}", o.files_per_sec),
            format!("  Avg time per file: {:.3} ms", o.avg_time_per_file_ms),
        ],
        TestOutcome::PackageInstall(o) => vec![
            format!("  Duration: {:.3} seconds", o.duration_sec),
            format!("  Packages: {}", o.packages),
            format!("  Installed: {}", format_bytes(o.installed_bytes as f64)),
        ],
    }
}

pub fn print_outcome(outcome: &TestOutcome) {
    for line in format_outcome(outcome) {
        println!("{}", line);
    }
}

pub fn print_section_header(title: &str) {
    println!("\n{}", rule('='));
    println!("{}", title);
    println!("{}", rule('='));
}

pub fn print_run_header(run: usize, total: usize) {
    println!("\n{}", rule('#'));
    println!("# RUN {} of {}", run, total);
    println!("{}\n", rule('#'));
}

fn mean_of<'a>(values: impl Iterator<Item = &'a f64>) -> Option<f64> {
    let values: Vec<f64> = values.copied().collect();
    if values.is_empty() {
        None
    } else {
        Some(crate::models::stats::mean(&values))
    }
}

/// Headline averages of one run
pub fn run_summary(run: &RunResults) -> Vec<String> {
    let mut seq_write = Vec::new();
    let mut seq_read = Vec::new();
    let mut rand_write = Vec::new();
    let mut rand_read = Vec::new();
    let mut lines = Vec::new();

    for record in &run.tests {
        match &record.outcome {
            TestOutcome::SequentialWrite(o) => seq_write.push(o.speed_bytes_per_sec),
            TestOutcome::SequentialRead(o) => seq_read.push(o.speed_bytes_per_sec),
            TestOutcome::RandomWrite(o) => rand_write.push(o.iops),
            TestOutcome::RandomRead(o) => rand_read.push(o.iops),
            _ => {}
        }
    }

    if let Some(m) = mean_of(seq_write.iter()) {
        lines.push(format!("Average Sequential Write Speed: {}", format_speed(m)));
    }
    if let Some(m) = mean_of(seq_read.iter()) {
        lines.push(format!("Average Sequential Read Speed: {}", format_speed(m)));
    }
    if let Some(m) = mean_of(rand_write.iter()) {
        lines.push(format!("Average Random Write IOPS: {:.2}", m));
    }
    if let Some(m) = mean_of(rand_read.iter()) {
        lines.push(format!("Average Random Read IOPS: {:.2}", m));
    }
    for record in &run.tests {
        match &record.outcome {
            TestOutcome::FileCreation(o) => {
                lines.push(format!("File Creation Rate: {:.2} files/sec", o.files_per_sec))
            }
            TestOutcome::FileDeletion(o) => {
                lines.push(format!("File Deletion Rate: {:.2} files/sec", o.files_per_sec))
            }
            TestOutcome::PackageInstall(o) => {
                lines.push(format!("{} install: {:.2} s", o.manager, o.duration_sec))
            }
            _ => {}
        }
    }
    lines
}

pub fn print_run_summary(run: &RunResults) {
    println!("\n{}", rule('='));
    println!("SUMMARY");
    println!("{}", rule('='));
    for line in run_summary(run) {
        println!("{}", line);
    }
}

fn mean_std(stat: &AggregatedStat, fmt: impl Fn(f64) -> String) -> String {
    format!("{} ± {}", fmt(stat.mean), fmt(stat.std_dev))
}

/// Aggregated results across runs, grouped by section
pub fn aggregated_report(stats: &AggregatedStatistics, num_runs: usize) -> String {
    let mut out = Vec::new();
    out.push(rule('='));
    out.push("AGGREGATED RESULTS ACROSS ALL RUNS".to_string());
    out.push(rule('='));

    if stats.is_empty() {
        out.push("No results to aggregate.".to_string());
        return out.join("\n");
    }
    out.push(format!("\nNumber of runs: {}", num_runs));

    for section in Section::ALL {
        let names = sorted_names(
            stats
                .keys()
                .filter(|name| Section::of_test(name) == Some(section)),
        );
        if names.is_empty() {
            continue;
        }

        out.push(format!("\n{}", rule('-')));
        out.push(section.title().to_string());
        out.push(rule('-'));

        for name in names {
            let metrics = &stats[name.as_str()];
            match section {
                Section::SequentialWrite | Section::SequentialRead => {
                    let size = test_size(name).unwrap_or(0);
                    out.push(format!("\n{} Files:", format_bytes(size as f64)));
                    if let Some(s) = metrics.get("speed_bytes_per_sec") {
                        out.push(format!("  Speed: {}", mean_std(s, format_speed)));
                        out.push(format!(
                            "  (Mean ± Std Dev, CV {:.1}%)",
                            s.coefficient_of_variation() * 100.0
                        ));
                    }
                }
                Section::RandomWrite | Section::RandomRead => {
                    let size = test_size(name).unwrap_or(0);
                    out.push(format!("\n{} Files:", format_bytes(size as f64)));
                    if let Some(s) = metrics.get("iops") {
                        out.push(format!("  IOPS: {}", mean_std(s, |v| format!("{:.2}", v))));
                    }
                    if let Some(s) = metrics.get("avg_latency_ms") {
                        out.push(format!(
                            "  Latency: {}",
                            mean_std(s, |v| format!("{:.3} ms", v))
                        ));
                    }
                }
                Section::Metadata => {
                    let label = if name == "file_creation" {
                        "File Creation"
                    } else {
                        "File Deletion"
                    };
                    out.push(format!("\n{}:", label));
                    if let Some(s) = metrics.get("files_per_sec") {
                        out.push(format!(
                            "  Rate: {} files/sec",
                            mean_std(s, |v| format!("{:.2}", v))
                        ));
                    }
                    if let Some(s) = metrics.get("avg_time_per_file_ms") {
                        out.push(format!(
                            "  Avg Time: {}",
                            mean_std(s, |v| format!("{:.3} ms", v))
                        ));
                    }
                }
                Section::RealWorld => {
                    out.push(format!("\n{}:", name.replace('_', " ")));
                    if let Some(s) = metrics.get("duration_sec") {
                        out.push(format!(
                            "  Duration: {}",
                            mean_std(s, |v| format!("{:.3} s", v))
                        ));
                    }
                }
            }
        }
    }
    out.join("\n")
}

pub fn print_aggregated(stats: &AggregatedStatistics, num_runs: usize) {
    println!("\n{}", aggregated_report(stats, num_runs));
}

type Formatter = fn(f64) -> String;

/// Metric that represents a test in the comparison table, with its formatter
fn headline_metric(name: &str) -> Option<(&'static str, Formatter)> {
    fn speed(v: f64) -> String {
        format_speed(v)
    }
    fn iops(v: f64) -> String {
        format_iops(v)
    }
    fn rate(v: f64) -> String {
        format!("{:.0} files/s", v)
    }
    fn secs(v: f64) -> String {
        format!("{:.2} s", v)
    }

    match Section::of_test(name)? {
        Section::SequentialWrite | Section::SequentialRead => Some(("speed_bytes_per_sec", speed as Formatter)),
        Section::RandomWrite | Section::RandomRead => Some(("iops", iops as Formatter)),
        Section::Metadata => Some(("files_per_sec", rate as Formatter)),
        Section::RealWorld => Some(("duration_sec", secs as Formatter)),
    }
}

/// Side-by-side headline means of several labelled reports
pub fn comparison_table(reports: &[(String, BenchmarkReport)]) -> String {
    if reports.is_empty() {
        return "No reports to compare.".to_string();
    }

    let all_names: BTreeSet<&String> = reports
        .iter()
        .flat_map(|(_, r)| r.aggregated_statistics.keys())
        .collect();
    let names = sorted_names(all_names.into_iter());

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut header = vec!["test".to_string()];
    header.extend(reports.iter().map(|(label, _)| label.clone()));
    rows.push(header);

    for name in names {
        let Some((metric, fmt)) = headline_metric(name) else {
            continue;
        };
        let mut row = vec![name.clone()];
        for (_, report) in reports {
            let cell = report
                .aggregated_statistics
                .get(name.as_str())
                .and_then(|m| m.get(metric))
                .map(|s| fmt(s.mean))
                .unwrap_or_else(|| "-".to_string());
            row.push(cell);
        }
        rows.push(row);
    }

    let columns = rows[0].len();
    let widths: Vec<usize> = (0..columns)
        .map(|c| rows.iter().map(|r| r[c].chars().count()).max().unwrap_or(0))
        .collect();

    let mut out = Vec::with_capacity(rows.len() + 1);
    for (i, row) in rows.iter().enumerate() {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(c, (cell, &w))| {
                if c == 0 {
                    format!("{:<w$}", cell, w = w)
                } else {
                    format!("{:>w$}", cell, w = w)
                }
            })
            .collect();
        out.push(line.join("  ").trim_end().to_string());
        if i == 0 {
            out.push(widths.iter().map(|&w| "-".repeat(w)).collect::<Vec<_>>().join("  "));
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BenchmarkConfig;
    use crate::models::{aggregate_runs, MetadataOutcome, ThroughputOutcome};

    fn seq(size: u64, speed: f64) -> TestOutcome {
        TestOutcome::SequentialWrite(ThroughputOutcome {
            file_size: size,
            num_files: 1,
            total_bytes: size,
            duration_sec: size as f64 / speed,
            speed_bytes_per_sec: speed,
            speed_formatted: format_speed(speed),
            trials: Vec::new(),
        })
    }

    fn creation(rate: f64) -> TestOutcome {
        TestOutcome::FileCreation(MetadataOutcome {
            files: 100,
            file_size: 4096,
            duration_sec: 100.0 / rate,
            files_per_sec: rate,
            avg_time_per_file_ms: 1000.0 / rate,
        })
    }

    fn sample_runs() -> Vec<RunResults> {
        (0..2)
            .map(|i| {
                let mut run = RunResults::new(i + 1);
                run.push("seq_write_104857600", seq(104857600, 200.0 * 1048576.0));
                run.push("seq_write_10485760", seq(10485760, 100.0 * 1048576.0));
                run.push("file_creation", creation(1000.0 + i as f64 * 100.0));
                run
            })
            .collect()
    }

    #[test]
    fn test_test_size() {
        assert_eq!(test_size("seq_write_10485760"), Some(10485760));
        assert_eq!(test_size("rand_read_4096"), Some(4096));
        assert_eq!(test_size("file_creation"), None);
    }

    #[test]
    fn test_aggregated_report_orders_sizes_numerically() {
        let stats = aggregate_runs(&sample_runs());
        let text = aggregated_report(&stats, 2);

        let small = text.find("10.00 MB Files").unwrap();
        let large = text.find("100.00 MB Files").unwrap();
        assert!(small < large);
        assert!(text.contains("Number of runs: 2"));
        assert!(text.contains("SEQUENTIAL WRITE PERFORMANCE"));
        assert!(text.contains("Rate: 1050.00 ± 70.71 files/sec"));
        assert!(!text.contains("RANDOM READ PERFORMANCE"));
    }

    #[test]
    fn test_aggregated_report_empty() {
        let text = aggregated_report(&AggregatedStatistics::new(), 0);
        assert!(text.contains("No results to aggregate."));
    }

    #[test]
    fn test_run_summary() {
        let runs = sample_runs();
        let lines = run_summary(&runs[0]);
        assert_eq!(lines[0], "Average Sequential Write Speed: 150.00 MB/s");
        assert!(lines.iter().any(|l| l == "File Creation Rate: 1000.00 files/sec"));
        assert!(!lines.iter().any(|l| l.contains("Read")));
    }

    #[test]
    fn test_format_outcome_lines() {
        let lines = format_outcome(&creation(500.0));
        assert_eq!(lines[1], "  Files per second: 500.00");
        assert_eq!(lines[2], "  Avg time per file: 2.000 ms");
    }

    #[test]
    fn test_comparison_table() {
        let config = BenchmarkConfig::default();
        let a = BenchmarkReport::new(config.clone(), sample_runs());
        let mut slower = sample_runs();
        slower.truncate(1);
        slower[0].tests.retain(|t| t.name != "file_creation");
        let b = BenchmarkReport::new(config, slower);

        let table = comparison_table(&[("ssd".to_string(), a), ("hdd".to_string(), b)]);
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].starts_with("test"));
        assert!(lines[0].contains("ssd") && lines[0].contains("hdd"));
        assert!(lines[1].starts_with("---"));
        assert!(lines[2].starts_with("seq_write_10485760"));
        assert!(lines[3].starts_with("seq_write_104857600"));
        let creation_row = lines.iter().find(|l| l.starts_with("file_creation")).unwrap();
        assert!(creation_row.contains("1050 files/s"));
        assert!(creation_row.trim_end().ends_with('-'));
    }

    #[test]
    fn test_comparison_table_empty() {
        assert_eq!(comparison_table(&[]), "No reports to compare.");
    }
}
