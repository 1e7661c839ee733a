//! Rounding and text rendering of metric values.
//!
//! Every numeric metric is rounded to two decimals before it is packaged into
//! a sample, and rendered as text only at the storage boundary.

use chrono::{DateTime, Local};

/// Sentinel stored in place of a metric that could not be read.
pub const UNAVAILABLE: &str = "N/A";

/// Timestamp layout of the `timestamp` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rounds to two decimal places, halves away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Renders a number in shortest form keeping at least one fractional digit.
///
/// `45.0` → `"45.0"`, `45.5` → `"45.5"`, `0.1 + 0.2` → `"0.30000000000000004"`.
pub fn format_number(value: f64) -> String {
    let text = value.to_string();
    if text.contains(['.', 'e', 'E']) || !value.is_finite() {
        text
    } else {
        format!("{}.0", text)
    }
}

/// Formats a local time as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(time: &DateTime<Local>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Formats a duration in whole seconds for log lines (`"2m"`, `"2m 5s"`, `"45s"`).
pub fn format_interval(secs: u64) -> String {
    match (secs / 60, secs % 60) {
        (0, s) => format!("{}s", s),
        (m, 0) => format!("{}m", m),
        (m, s) => format!("{}m {}s", m, s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_round2() {
        assert_eq!(round2(45.678), 45.68);
        assert_eq!(round2(45.671), 45.67);
        assert_eq!(round2(12.0), 12.0);
        assert_eq!(round2(93.4521), 93.45);
    }

    #[test]
    fn test_format_number_keeps_fraction() {
        assert_eq!(format_number(45.0), "45.0");
        assert_eq!(format_number(45.5), "45.5");
        assert_eq!(format_number(45.68), "45.68");
        assert_eq!(format_number(0.0), "0.0");
        assert_eq!(format_number(-3.25), "-3.25");
    }

    #[test]
    fn test_format_timestamp() {
        let time = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(format_timestamp(&time), "2024-03-07 09:05:01");
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(120), "2m");
        assert_eq!(format_interval(125), "2m 5s");
        assert_eq!(format_interval(45), "45s");
    }
}
