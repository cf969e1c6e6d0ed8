pub use super::model::{
    FieldValue, Level, LogEntry, LogFormat, ParseError, TimestampError, TimestampFailure,
};

/// How a batch reacts when one line fails to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// First failing line aborts the whole batch
    FailFast,
    /// Every line yields a record; the batch always completes
    BestEffort,
}

pub trait FormatDetector: Send + Sync {
    /// Whether a single sample line looks like this format
    fn matches(&self, line: &str) -> bool;
    fn format(&self) -> LogFormat;
}

pub trait LogParser: Send + Sync {
    /// Extract one trimmed, non-empty line into a record
    fn parse_line(&self, line: &str) -> Result<LogEntry, ParseError>;
    fn format(&self) -> LogFormat;
    fn policy(&self) -> ErrorPolicy;
}
