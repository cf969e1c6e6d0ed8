use std::sync::LazyLock;

use chrono::Utc;
use regex::bytes::{Captures, Regex, RegexBuilder};

use crate::parser::normalize::{normalize_level, TimeLayout};
use crate::parser::traits::*;

/// One recognized free-text line shape.
///
/// Capture group indices are 1-based; `None` means the shape carries no such
/// part. Patterns are compiled with Unicode off, so `\w`, `\d` and `\s` only
/// match ASCII.
#[derive(Debug)]
pub struct TextPattern {
    pub name: &'static str,
    pub regex: Regex,
    /// Layout used for the timestamp capture. No other layout is tried.
    pub layout: Option<TimeLayout>,
    pub timestamp_group: Option<usize>,
    pub level_group: Option<usize>,
    pub message_group: Option<usize>,
}

struct PatternSpec {
    name: &'static str,
    regex: &'static str,
    layout: Option<TimeLayout>,
    groups: (Option<usize>, Option<usize>, Option<usize>),
}

const PATTERN_SPECS: [PatternSpec; 4] = [
    PatternSpec {
        name: "syslog",
        regex: r"^(\w{3}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2})\s+\S+\s+\S+:\s+\[?(\w+)\]?\s+(.*)$",
        layout: Some(TimeLayout::Syslog),
        groups: (Some(1), Some(2), Some(3)),
    },
    PatternSpec {
        name: "datetime_bracket_level",
        regex: r"^(\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2})\s+\[(\w+)\]\s+(.*)$",
        layout: Some(TimeLayout::DateTime),
        groups: (Some(1), Some(2), Some(3)),
    },
    PatternSpec {
        name: "iso8601_level",
        regex: r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z?)\s+\[?(\w+)\]?\s+(.*)$",
        layout: Some(TimeLayout::Rfc3339),
        groups: (Some(1), Some(2), Some(3)),
    },
    PatternSpec {
        name: "bracket_level",
        regex: r"^\[(\w+)\]\s+(.*)$",
        layout: None,
        groups: (None, Some(1), Some(2)),
    },
];

/// Ordered pattern table, compiled once. A pattern that fails to compile is
/// logged and left out; the rest keep their relative order.
pub static PATTERNS: LazyLock<Vec<TextPattern>> = LazyLock::new(|| {
    PATTERN_SPECS
        .iter()
        .filter_map(|spec| match RegexBuilder::new(spec.regex).unicode(false).build() {
            Ok(regex) => Some(TextPattern {
                name: spec.name,
                regex,
                layout: spec.layout,
                timestamp_group: spec.groups.0,
                level_group: spec.groups.1,
                message_group: spec.groups.2,
            }),
            Err(e) => {
                tracing::warn!(pattern = spec.name, error = %e, "dropping text pattern");
                None
            }
        })
        .collect()
});

/// Text is the fallback format: every line qualifies.
pub struct TextDetector;

impl FormatDetector for TextDetector {
    fn matches(&self, _line: &str) -> bool {
        true
    }

    fn format(&self) -> LogFormat {
        LogFormat::Text
    }
}

pub struct TextParser;

impl TextParser {
    /// Match the line against the table in order. The first match wins, no
    /// scoring. Unmatched lines keep the whole line as message.
    pub fn extract(&self, line: &str) -> LogEntry {
        let mut entry = LogEntry::with_message(line);
        let mut timestamp = None;

        let Some((pattern, caps)) = PATTERNS
            .iter()
            .find_map(|p| p.regex.captures(line.as_bytes()).map(|caps| (p, caps)))
        else {
            return entry;
        };

        let raw_timestamp = group(line, &caps, pattern.timestamp_group);
        if let (Some(raw), Some(layout)) = (raw_timestamp, pattern.layout) {
            timestamp = layout.parse(raw);
            if timestamp.is_none() {
                tracing::trace!(
                    pattern = pattern.name,
                    value = raw,
                    "text timestamp did not match layout"
                );
            }
        }

        if let Some(raw) = group(line, &caps, pattern.level_group) {
            entry.level = normalize_level(raw);
        }

        if let Some(raw) = group(line, &caps, pattern.message_group) {
            entry.message = raw.to_string();
        }

        entry.timestamp = timestamp.unwrap_or_else(Utc::now);
        entry
    }
}

/// Text of a capture group. Groups start and end on ASCII delimiters or the
/// line ends, so the byte range is always a char boundary.
fn group<'a>(line: &'a str, caps: &Captures<'_>, index: Option<usize>) -> Option<&'a str> {
    let m = caps.get(index?)?;
    line.get(m.range())
}

impl LogParser for TextParser {
    fn parse_line(&self, line: &str) -> Result<LogEntry, ParseError> {
        Ok(self.extract(line))
    }

    fn format(&self) -> LogFormat {
        LogFormat::Text
    }

    fn policy(&self) -> ErrorPolicy {
        ErrorPolicy::BestEffort
    }
}
