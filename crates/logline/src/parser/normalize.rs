//! Normalize: severity canonicalization and timestamp parsing shared by all
//! extractors.
//!
//! Neither routine falls back to "now": [`parse_timestamp`] reports failure and
//! the caller decides what to do with it.

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde_json::Value;

use super::model::{Level, TimestampError, TimestampFailure};

/// Map a raw severity string onto the canonical set.
///
/// Short aliases (`DBG`, `INF`, `WRN`, `ERR`, `FTL`) and `WARNING` are
/// accepted in any case. Anything else, including the empty string, is `Info`.
pub fn normalize_level(raw: &str) -> Level {
    match raw.to_uppercase().as_str() {
        "DEBUG" | "DBG" => Level::Debug,
        "INFO" | "INF" => Level::Info,
        "WARN" | "WARNING" | "WRN" => Level::Warn,
        "ERROR" | "ERR" => Level::Error,
        "FATAL" | "FTL" => Level::Fatal,
        _ => Level::Info,
    }
}

/// Textual timestamp layouts understood by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLayout {
    /// `2024-01-02T15:04:05+02:00` / `2024-01-02T15:04:05Z`
    Rfc3339,
    /// `2024-01-02T15:04:05.123456789Z`
    Rfc3339Nano,
    /// `2024-01-02T15:04:05.000Z`
    MillisUtc,
    /// `2024-01-02 15:04:05`, read as UTC
    DateTime,
    /// `Jan 02 15:04:05`, no year: the current UTC year is assumed
    Syslog,
}

/// Order in which [`parse_timestamp_str`] tries layouts. First success wins.
pub const TIME_LAYOUTS: [TimeLayout; 5] = [
    TimeLayout::Rfc3339,
    TimeLayout::Rfc3339Nano,
    TimeLayout::MillisUtc,
    TimeLayout::DateTime,
    TimeLayout::Syslog,
];

impl TimeLayout {
    pub fn parse(&self, s: &str) -> Option<DateTime<Utc>> {
        match self {
            TimeLayout::Rfc3339 => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            TimeLayout::Rfc3339Nano => DateTime::parse_from_str(s, "%+")
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            TimeLayout::MillisUtc => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.3fZ")
                .ok()
                .map(|ndt| ndt.and_utc()),
            TimeLayout::DateTime => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc()),
            TimeLayout::Syslog => {
                let with_year = format!("{} {}", Utc::now().year(), s);
                NaiveDateTime::parse_from_str(&with_year, "%Y %b %d %H:%M:%S")
                    .ok()
                    .map(|ndt| ndt.and_utc())
            }
        }
    }
}

/// Parse a textual timestamp against [`TIME_LAYOUTS`] in order.
pub fn parse_timestamp_str(s: &str) -> Result<DateTime<Utc>, TimestampError> {
    TIME_LAYOUTS
        .iter()
        .find_map(|layout| layout.parse(s))
        .ok_or_else(|| TimestampError::new(s, TimestampFailure::UnknownLayout))
}

/// Parse a timestamp from a decoded value.
///
/// Strings go through the layout list; numbers are Unix epoch seconds with
/// any fractional part truncated. Other shapes are rejected.
pub fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, TimestampError> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => {
            let secs = n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .ok_or_else(|| TimestampError::new(n.to_string(), TimestampFailure::OutOfRange))?;
            DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| TimestampError::new(n.to_string(), TimestampFailure::OutOfRange))
        }
        other => Err(TimestampError::new(
            other.to_string(),
            TimestampFailure::UnsupportedType,
        )),
    }
}
