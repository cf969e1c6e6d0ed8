use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::parser::normalize::{normalize_level, parse_timestamp};
use crate::parser::traits::*;

const TIMESTAMP_KEYS: [&str; 4] = ["timestamp", "time", "@timestamp", "ts"];
/// `log.level` is a literal key, not a path into a nested object.
const LEVEL_KEYS: [&str; 3] = ["level", "severity", "log.level"];
const MESSAGE_KEYS: [&str; 3] = ["message", "msg", "log"];

/// JSON format detector
pub struct JsonDetector;

impl FormatDetector for JsonDetector {
    fn matches(&self, line: &str) -> bool {
        let trimmed = line.trim();

        // Quick reject before paying for a full decode
        if !trimmed.starts_with('{') || !trimmed.ends_with('}') {
            return false;
        }

        serde_json::from_str::<Map<String, Value>>(trimmed).is_ok()
    }

    fn format(&self) -> LogFormat {
        LogFormat::Json
    }
}

/// JSON parser
///
/// Decode failures are hard errors: in a JSON batch one bad line aborts the
/// whole batch.
pub struct JsonParser;

impl LogParser for JsonParser {
    fn parse_line(&self, line: &str) -> Result<LogEntry, ParseError> {
        // Arrays and primitives fail here too
        let mut obj: Map<String, Value> = serde_json::from_str(line)?;

        let timestamp = take_timestamp(&mut obj).unwrap_or_else(Utc::now);
        let level = take_string(&mut obj, &LEVEL_KEYS)
            .map(|raw| normalize_level(&raw))
            .unwrap_or_default();
        let message = take_string(&mut obj, &MESSAGE_KEYS).unwrap_or_default();

        Ok(LogEntry {
            timestamp,
            level,
            message,
            fields: obj
                .into_iter()
                .map(|(k, v)| (k, FieldValue::from(v)))
                .collect(),
        })
    }

    fn format(&self) -> LogFormat {
        LogFormat::Json
    }

    fn policy(&self) -> ErrorPolicy {
        ErrorPolicy::FailFast
    }
}

// Helper functions

/// First key whose value parses as a timestamp wins and is removed.
fn take_timestamp(obj: &mut Map<String, Value>) -> Option<DateTime<Utc>> {
    for key in TIMESTAMP_KEYS {
        let Some(value) = obj.get(key) else {
            continue;
        };
        match parse_timestamp(value) {
            Ok(ts) => {
                obj.remove(key);
                return Some(ts);
            }
            Err(e) => tracing::trace!(key, error = %e, "json timestamp candidate rejected"),
        }
    }
    None
}

/// First string-valued key wins and is removed. Non-string hits are left in
/// place and the search moves on.
fn take_string(obj: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    let key = keys.iter().find(|key| matches!(obj.get(**key), Some(Value::String(_))))?;
    match obj.remove(*key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}
