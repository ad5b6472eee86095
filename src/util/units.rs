//! Units formatting and conversion utilities
//!
//! Provides functions for human-readable formatting of sizes, speeds,
//! durations and rates, plus parsing of user-supplied sizes/durations.

use byte_unit::Byte;
use std::time::Duration;

/// Format a byte count with binary units and two decimals
///
/// # Examples
/// ```
/// use fsperf::util::units::format_bytes;
///
/// assert_eq!(format_bytes(512.0), "512.00 B");
/// assert_eq!(format_bytes(10.0 * 1024.0 * 1024.0), "10.00 MB");
/// ```
pub fn format_bytes(bytes: f64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    const THRESHOLD: f64 = 1024.0;

    let mut size = bytes;
    for unit in UNITS {
        if size.abs() < THRESHOLD {
            return format!("{:.2} {}", size, unit);
        }
        size /= THRESHOLD;
    }
    format!("{:.2} TB", size)
}

/// Format a bytes-per-second rate
///
/// # Examples
/// ```
/// use fsperf::util::units::format_speed;
///
/// assert_eq!(format_speed(1536.0), "1.50 KB/s");
/// ```
pub fn format_speed(bytes_per_sec: f64) -> String {
    format_bytes(bytes_per_sec) + "/s"
}

/// Parse human-readable size string into bytes
///
/// Supports decimal (KB, MB, GB) and binary (KiB, MiB, GiB) units,
/// case-insensitively; a bare number is bytes.
///
/// # Examples
/// ```
/// use fsperf::util::units::parse_bytes;
///
/// assert_eq!(parse_bytes("1 KiB").unwrap(), 1024);
/// assert_eq!(parse_bytes("2 GB").unwrap(), 2_000_000_000);
/// ```
pub fn parse_bytes(input: &str) -> Result<u64, String> {
    Byte::parse_str(input.trim(), true)
        .map(|b| b.as_u64())
        .map_err(|e| format!("Invalid size '{}': {}", input, e))
}

/// Parse a duration such as "90s", "10m" or "1h 30m"
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    humantime::parse_duration(input.trim())
        .map_err(|e| format!("Invalid duration '{}': {}", input, e))
}

/// Format duration into human-readable string
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use fsperf::util::units::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 3600 {
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if total_secs >= 60 {
        let minutes = total_secs / 60;
        let seconds = total_secs % 60;
        format!("{}m {}s", minutes, seconds)
    } else if total_secs > 0 {
        if millis > 0 {
            format!("{}.{:02}s", total_secs, millis / 10)
        } else {
            format!("{}s", total_secs)
        }
    } else {
        format!("{}ms", millis)
    }
}

/// Calculate throughput in bytes per second, 0 for a zero duration
pub fn calculate_throughput_bps(bytes: u64, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 0.0;
    }
    bytes as f64 / duration.as_secs_f64()
}

/// Calculate IOPS (Input/Output Operations Per Second)
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use fsperf::util::units::calculate_iops;
///
/// let iops = calculate_iops(1000, Duration::from_secs(1));
/// assert!((iops - 1000.0).abs() < 0.01);
/// ```
pub fn calculate_iops(operations: u64, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 0.0;
    }
    operations as f64 / duration.as_secs_f64()
}

/// Format IOPS value with appropriate units
pub fn format_iops(iops: f64) -> String {
    if iops >= 1_000_000.0 {
        format!("{:.1}M IOPS", iops / 1_000_000.0)
    } else if iops >= 1_000.0 {
        format!("{:.1}K IOPS", iops / 1_000.0)
    } else {
        format!("{:.0} IOPS", iops)
    }
}

/// Format latency duration with appropriate precision
pub fn format_latency(duration: Duration) -> String {
    let micros = duration.as_micros();

    if micros >= 1000 {
        let millis = micros as f64 / 1000.0;
        format!("{:.2}ms", millis)
    } else {
        format!("{}μs", micros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0.0), "0.00 B");
        assert_eq!(format_bytes(512.0), "512.00 B");
        assert_eq!(format_bytes(1024.0), "1.00 KB");
        assert_eq!(format_bytes(1536.0), "1.50 KB");
        assert_eq!(format_bytes(500.0 * 1024.0 * 1024.0), "500.00 MB");
        assert_eq!(format_bytes(1073741824.0), "1.00 GB");
        assert_eq!(format_bytes(1099511627776.0), "1.00 TB");
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(0.0), "0.00 B/s");
        assert_eq!(format_speed(250.0 * 1024.0 * 1024.0), "250.00 MB/s");
    }

    #[test]
    fn test_parse_bytes() {
        assert_eq!(parse_bytes("1024").unwrap(), 1024);
        assert_eq!(parse_bytes("1 KiB").unwrap(), 1024);
        assert_eq!(parse_bytes("64MiB").unwrap(), 64 * 1024 * 1024);
        assert_eq!(parse_bytes("2 GB").unwrap(), 2_000_000_000);
        assert_eq!(parse_bytes(" 1GiB ").unwrap(), 1073741824);

        assert!(parse_bytes("invalid").is_err());
        assert!(parse_bytes("1 XB").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("1h 30m").unwrap(), Duration::from_secs(5400));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m 1s");
    }

    #[test]
    fn test_calculate_throughput_bps() {
        let throughput = calculate_throughput_bps(1048576, Duration::from_secs(1));
        assert!((throughput - 1048576.0).abs() < 0.01);

        let throughput = calculate_throughput_bps(2097152, Duration::from_secs(2));
        assert!((throughput - 1048576.0).abs() < 0.01);

        assert_eq!(calculate_throughput_bps(1000, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_calculate_iops() {
        let iops = calculate_iops(500, Duration::from_millis(500));
        assert!((iops - 1000.0).abs() < 0.01);
        assert_eq!(calculate_iops(1000, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_format_iops() {
        assert_eq!(format_iops(500.0), "500 IOPS");
        assert_eq!(format_iops(1500.0), "1.5K IOPS");
        assert_eq!(format_iops(2500000.0), "2.5M IOPS");
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency(Duration::from_millis(5)), "5.00ms");
        assert_eq!(format_latency(Duration::from_micros(500)), "500μs");
        assert_eq!(format_latency(Duration::from_micros(1500)), "1.50ms");
    }
}
