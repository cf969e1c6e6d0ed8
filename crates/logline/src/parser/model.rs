use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum LogFormat {
    /// Detect the format from a sample of the batch (request-time only)
    Auto,
    /// JSON object per line
    Json,
    /// Logfmt key=value pairs
    Logfmt,
    /// Free text matched against known line shapes
    Text,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Auto => "auto",
            LogFormat::Json => "json",
            LogFormat::Logfmt => "logfmt",
            LogFormat::Text => "text",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for LogFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(LogFormat::Auto),
            "json" => Ok(LogFormat::Json),
            "logfmt" => Ok(LogFormat::Logfmt),
            "text" => Ok(LogFormat::Text),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// Deserialization goes through [`FromStr`], so names are case-insensitive
/// in config files as well as on the command line.
impl TryFrom<String> for LogFormat {
    type Error = UnknownFormat;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Canonical severity. Everything unrecognized collapses to `Info`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dynamically-typed value of a residual field.
///
/// Closed set of shapes a JSON document can carry. Serializes untagged, so a
/// record written back out as JSON shows the original value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<FieldValue>),
    Object(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Boolean(b),
            Value::Number(n) => FieldValue::Number(n),
            Value::String(s) => FieldValue::Text(s),
            Value::Array(items) => FieldValue::List(items.into_iter().map(FieldValue::from).collect()),
            Value::Object(map) => FieldValue::Object(
                map.into_iter().map(|(k, v)| (k, FieldValue::from(v))).collect(),
            ),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// One normalized log record, produced once per input line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Parsed from the line when possible, otherwise the moment of extraction
    pub timestamp: DateTime<Utc>,

    pub level: Level,

    /// Main log message (empty when a structured line carries none)
    pub message: String,

    /// Everything not lifted into timestamp/level/message
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldValue>,
}

impl LogEntry {
    /// Entry with the given message, default level, and the current time.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level: Level::Info,
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: Box<ParseError>,
    },

    #[error("Line too large: {0} bytes (max: {1} bytes)")]
    LineTooLarge(usize, usize),

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// Attach the 1-based line number the failure happened on.
    pub fn at_line(self, line: usize) -> Self {
        ParseError::Line {
            line,
            source: Box::new(self),
        }
    }

    /// True when the root cause is a structured decode failure.
    pub fn is_decode(&self) -> bool {
        match self {
            ParseError::Decode(_) => true,
            ParseError::Line { source, .. } => source.is_decode(),
            _ => false,
        }
    }
}

/// Why a timestamp candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFailure {
    UnknownLayout,
    UnsupportedType,
    OutOfRange,
}

impl fmt::Display for TimestampFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampFailure::UnknownLayout => f.write_str("unknown time format"),
            TimestampFailure::UnsupportedType => f.write_str("unsupported timestamp type"),
            TimestampFailure::OutOfRange => f.write_str("timestamp out of range"),
        }
    }
}

/// Soft failure from timestamp parsing. Extractors swallow it and fall back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("timestamp: {reason}: {value}")]
pub struct TimestampError {
    /// Offending raw value, rendered as text
    pub value: String,
    pub reason: TimestampFailure,
}

impl TimestampError {
    pub fn new(value: impl Into<String>, reason: TimestampFailure) -> Self {
        Self {
            value: value.into(),
            reason,
        }
    }
}
