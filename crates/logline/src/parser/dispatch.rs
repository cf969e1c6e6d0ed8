use std::io::BufRead;
use std::sync::Arc;
use std::time::Instant;

use super::detector::FormatDetectorOrchestrator;
use super::formats::{JsonParser, LogfmtParser, TextParser};
use super::metrics::{MetricErrorType, ParsingMetrics};
use super::traits::*;
use super::MAX_LINE_SIZE;
use crate::source;

/// Batch parser: picks an extractor (or detects one) and runs it over every
/// line under that extractor's [`ErrorPolicy`].
#[derive(Debug, Clone)]
pub struct Parser {
    format: LogFormat,
    max_line_size: usize,
    metrics: Option<Arc<ParsingMetrics>>,
}

impl Parser {
    /// Detect the format per batch.
    pub fn with_auto_detect() -> Self {
        Self::with_format(LogFormat::Auto)
    }

    /// Use a fixed format. `Auto` is the same as [`Parser::with_auto_detect`].
    pub fn with_format(format: LogFormat) -> Self {
        Self {
            format,
            max_line_size: MAX_LINE_SIZE,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ParsingMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Limit applied by [`Parser::parse`] when reading a stream.
    pub fn with_max_line_size(mut self, max_line_size: usize) -> Self {
        self.max_line_size = max_line_size;
        self
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    pub fn max_line_size(&self) -> usize {
        self.max_line_size
    }

    /// Read a whole stream and parse it as one batch.
    pub fn parse<R: BufRead>(&self, reader: R) -> Result<Vec<LogEntry>, ParseError> {
        let lines = match source::read_lines(reader, self.max_line_size) {
            Ok(lines) => lines,
            Err(e) => {
                if matches!(e, ParseError::LineTooLarge(..)) {
                    self.record_error(MetricErrorType::TooLarge);
                }
                return Err(e);
            }
        };
        self.parse_lines(&lines)
    }

    /// Parse an in-memory string. No line size limit applies.
    pub fn parse_text(&self, input: &str) -> Result<Vec<LogEntry>, ParseError> {
        let lines: Vec<&str> = input.split('\n').collect();
        self.parse_lines(&lines)
    }

    /// Parse already-split lines.
    ///
    /// Lines are trimmed and blank ones dropped before detection. One record
    /// per remaining line in input order, or the first failure under a
    /// fail-fast extractor. Line numbers in errors count remaining lines.
    pub fn parse_lines<S: AsRef<str>>(&self, lines: &[S]) -> Result<Vec<LogEntry>, ParseError> {
        let lines: Vec<&str> = lines
            .iter()
            .map(|line| line.as_ref().trim())
            .filter(|line| !line.is_empty())
            .collect();
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let format = self.resolve_format(&lines);
        let extractor = extractor_for(format);
        let policy = extractor.policy();

        let mut entries = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            let started = Instant::now();
            let entry = match (extractor.parse_line(line), policy) {
                (Ok(entry), _) => entry,
                (Err(e), ErrorPolicy::FailFast) => {
                    if e.is_decode() {
                        self.record_error(MetricErrorType::Decode);
                    }
                    return Err(e.at_line(i + 1));
                }
                (Err(e), ErrorPolicy::BestEffort) => {
                    tracing::warn!(line = i + 1, %format, error = %e, "keeping line as raw text");
                    self.record_error(MetricErrorType::RawFallback);
                    LogEntry::with_message(*line)
                }
            };
            self.record_parse(format, started);
            entries.push(entry);
        }

        tracing::debug!(%format, lines = entries.len(), "parsed batch");
        Ok(entries)
    }

    fn resolve_format(&self, lines: &[&str]) -> LogFormat {
        if self.format != LogFormat::Auto {
            return self.format;
        }
        let detected = FormatDetectorOrchestrator::new().detect(lines);
        if let Some(metrics) = &self.metrics {
            metrics.record_detection(detected);
        }
        detected
    }

    fn record_parse(&self, format: LogFormat, started: Instant) {
        if let Some(metrics) = &self.metrics {
            let nanos = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
            metrics.record_parse(format, nanos);
        }
    }

    fn record_error(&self, error_type: MetricErrorType) {
        if let Some(metrics) = &self.metrics {
            metrics.record_error(error_type);
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::with_auto_detect()
    }
}

/// `Auto` never reaches here once resolved; it maps to the fallback.
fn extractor_for(format: LogFormat) -> &'static dyn LogParser {
    match format {
        LogFormat::Json => &JsonParser,
        LogFormat::Logfmt => &LogfmtParser,
        LogFormat::Text | LogFormat::Auto => &TextParser,
    }
}
