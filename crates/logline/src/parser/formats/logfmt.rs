use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::parser::normalize::{normalize_level, parse_timestamp_str};
use crate::parser::traits::*;

/// Substrings a line must carry (besides a bare `=`) to vote for logfmt.
const LOGFMT_MARKERS: [&str; 4] = ["level=", "msg=", "time=", "timestamp="];

const TIMESTAMP_KEYS: [&str; 3] = ["timestamp", "time", "ts"];
const MESSAGE_KEYS: [&str; 2] = ["msg", "message"];

pub struct LogfmtDetector;

impl FormatDetector for LogfmtDetector {
    fn matches(&self, line: &str) -> bool {
        line.contains('=') && LOGFMT_MARKERS.iter().any(|marker| line.contains(marker))
    }

    fn format(&self) -> LogFormat {
        LogFormat::Logfmt
    }
}

/// Tokenizer states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    ReadingKey,
    ReadingValue,
    ReadingQuotedValue,
}

/// Single-pass key=value tokenizer.
///
/// Transitions:
/// - `ReadingKey` --unescaped `=`--> `ReadingValue`; anything else (spaces and
///   `\=` included) extends the key.
/// - `ReadingValue` --unescaped `"`--> `ReadingQuotedValue`; an unescaped space
///   emits the pair and returns to `ReadingKey`. Escapes keep their backslash.
/// - `ReadingQuotedValue` --unescaped `"`--> `ReadingValue`; everything else,
///   escaped quotes and their backslash included, is kept verbatim.
///
/// Malformed quoting never fails; it degrades to literal text.
#[derive(Debug)]
pub struct Tokenizer {
    state: TokenState,
    key: String,
    value: String,
    prev: Option<char>,
    pairs: BTreeMap<String, String>,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            state: TokenState::ReadingKey,
            key: String::new(),
            value: String::new(),
            prev: None,
            pairs: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> TokenState {
        self.state
    }

    /// Feed one character through the automaton.
    pub fn push(&mut self, c: char) {
        let escaped = self.prev == Some('\\');

        match (self.state, c) {
            (TokenState::ReadingKey, '=') if !escaped => self.state = TokenState::ReadingValue,
            (TokenState::ReadingKey, _) => self.key.push(c),

            (TokenState::ReadingValue, '"') if !escaped => {
                self.state = TokenState::ReadingQuotedValue;
            }
            (TokenState::ReadingValue, ' ') if !escaped => self.emit(),
            (TokenState::ReadingValue, _) => self.value.push(c),

            (TokenState::ReadingQuotedValue, '"') if !escaped => {
                self.state = TokenState::ReadingValue;
            }
            (TokenState::ReadingQuotedValue, _) => self.value.push(c),
        }

        self.prev = Some(c);
    }

    /// Flush the pending pair and return everything collected.
    ///
    /// A pending key only survives if its `=` was consumed; an unterminated
    /// quote keeps whatever was accumulated.
    pub fn finish(mut self) -> BTreeMap<String, String> {
        if self.state != TokenState::ReadingKey && !self.key.is_empty() {
            let key = std::mem::take(&mut self.key);
            let value = std::mem::take(&mut self.value);
            self.pairs.insert(key, value);
        }
        self.pairs
    }

    fn emit(&mut self) {
        let key = std::mem::take(&mut self.key);
        let value = std::mem::take(&mut self.value);
        if !key.is_empty() {
            self.pairs.insert(key, value);
        }
        self.state = TokenState::ReadingKey;
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a logfmt line into key/value pairs. Later duplicates overwrite
/// earlier ones.
pub fn tokenize(line: &str) -> BTreeMap<String, String> {
    let mut tokenizer = Tokenizer::new();
    for c in line.chars() {
        tokenizer.push(c);
    }
    tokenizer.finish()
}

pub struct LogfmtParser;

impl LogfmtParser {
    /// Extract one line. Infallible: every non-empty line yields a record.
    pub fn extract(&self, line: &str) -> LogEntry {
        let mut pairs = tokenize(line);

        let timestamp = take_timestamp(&mut pairs).unwrap_or_else(Utc::now);
        let level = pairs
            .remove("level")
            .map(|raw| normalize_level(&raw))
            .unwrap_or_default();
        let message = MESSAGE_KEYS
            .iter()
            .find_map(|key| pairs.remove(*key))
            .unwrap_or_default();

        LogEntry {
            timestamp,
            level,
            message,
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k, FieldValue::Text(v)))
                .collect(),
        }
    }
}

impl LogParser for LogfmtParser {
    fn parse_line(&self, line: &str) -> Result<LogEntry, ParseError> {
        Ok(self.extract(line))
    }

    fn format(&self) -> LogFormat {
        LogFormat::Logfmt
    }

    fn policy(&self) -> ErrorPolicy {
        ErrorPolicy::BestEffort
    }
}

/// First timestamp key whose value parses wins and is removed. Keys that fail
/// to parse stay behind as ordinary fields.
fn take_timestamp(pairs: &mut BTreeMap<String, String>) -> Option<DateTime<Utc>> {
    for key in TIMESTAMP_KEYS {
        let Some(raw) = pairs.get(key) else {
            continue;
        };
        match parse_timestamp_str(raw) {
            Ok(ts) => {
                pairs.remove(key);
                return Some(ts);
            }
            Err(e) => tracing::trace!(key, error = %e, "logfmt timestamp candidate rejected"),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn pairs(input: &str) -> Vec<(String, String)> {
        tokenize(input).into_iter().collect()
    }

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    // ── Detector ─────────────────────────────────────────────────

    #[test]
    fn test_logfmt_detector_valid() {
        let detector = LogfmtDetector;

        let samples = [
            "level=info msg=hello",
            "time=2024-01-02T15:04:05Z service=api",
            "timestamp=now foo=bar",
            r#"a=1 msg="hello world""#,
        ];

        for sample in samples {
            assert!(detector.matches(sample), "expected logfmt: {}", sample);
        }
    }

    #[test]
    fn test_logfmt_detector_requires_marker() {
        let detector = LogfmtDetector;

        // Well-formed pairs without a well-known key are not counted
        assert!(!detector.matches("user=alice action=login"));
        assert!(!detector.matches("no equals signs here"));
        assert!(!detector.matches("[INFO] level is fine"));
    }

    // ── Tokenizer ────────────────────────────────────────────────

    #[test]
    fn test_tokenize_simple_pairs() {
        assert_eq!(
            pairs("level=info msg=hello"),
            vec![pair("level", "info"), pair("msg", "hello")]
        );
    }

    #[test]
    fn test_tokenize_quoted_value_with_spaces() {
        assert_eq!(
            pairs(r#"msg="Connection timeout" service=worker"#),
            vec![pair("msg", "Connection timeout"), pair("service", "worker")]
        );
    }

    #[test]
    fn test_tokenize_keeps_escaped_quotes_verbatim() {
        let out = tokenize(r#"msg="say \"hi\" now" x=1"#);
        assert_eq!(out["msg"], r#"say \"hi\" now"#);
        assert_eq!(out["x"], "1");
    }

    #[test]
    fn test_tokenize_escaped_quote_outside_quotes_is_literal() {
        let out = tokenize(r#"k=a\"b"#);
        assert_eq!(out["k"], r#"a\"b"#);
    }

    #[test]
    fn test_tokenize_escaped_equals_extends_key() {
        let out = tokenize(r#"a\=b=c"#);
        assert_eq!(out.len(), 1);
        assert_eq!(out[r#"a\=b"#], "c");
    }

    #[test]
    fn test_tokenize_escaped_space_extends_value() {
        assert_eq!(
            pairs(r#"k=a\ b level=info"#),
            vec![pair("k", r#"a\ b"#), pair("level", "info")]
        );
    }

    #[test]
    fn test_tokenize_equals_inside_value() {
        let out = tokenize("query=a=b&c=d level=info");
        assert_eq!(out["query"], "a=b&c=d");
        assert_eq!(out["level"], "info");
    }

    #[test]
    fn test_tokenize_empty_values() {
        assert_eq!(
            pairs(r#"key="" empty_val="#),
            vec![pair("empty_val", ""), pair("key", "")]
        );
    }

    #[test]
    fn test_tokenize_unterminated_quote_keeps_rest() {
        let out = tokenize(r#"msg="never closed level=error"#);
        assert_eq!(out.len(), 1);
        assert_eq!(out["msg"], "never closed level=error");
    }

    #[test]
    fn test_tokenize_bare_word_joins_next_key() {
        // Spaces while reading a key are part of the key
        let out = tokenize("garbage key=value");
        assert_eq!(out["garbage key"], "value");
    }

    #[test]
    fn test_tokenize_trailing_key_without_equals_is_dropped() {
        assert_eq!(pairs("a=1 dangling"), vec![pair("a", "1")]);
        assert!(tokenize("hello").is_empty());
    }

    #[test]
    fn test_tokenize_empty_key_is_not_emitted() {
        assert!(tokenize("=value").is_empty());
        assert_eq!(pairs("=x b=2"), vec![pair("b", "2")]);
    }

    #[test]
    fn test_tokenize_duplicate_key_last_wins() {
        assert_eq!(tokenize("a=1 a=2")["a"], "2");
    }

    #[test]
    fn test_tokenize_unicode() {
        let out = tokenize(r#"unicode="🧊 ice" key.with.dots=ok"#);
        assert_eq!(out["unicode"], "🧊 ice");
        assert_eq!(out["key.with.dots"], "ok");
    }

    #[test]
    fn test_tokenizer_state_transitions() {
        let mut t = Tokenizer::new();
        assert_eq!(t.state(), TokenState::ReadingKey);
        for c in "k=".chars() {
            t.push(c);
        }
        assert_eq!(t.state(), TokenState::ReadingValue);
        t.push('"');
        assert_eq!(t.state(), TokenState::ReadingQuotedValue);
        t.push(' ');
        assert_eq!(t.state(), TokenState::ReadingQuotedValue);
        t.push('"');
        assert_eq!(t.state(), TokenState::ReadingValue);
        t.push(' ');
        assert_eq!(t.state(), TokenState::ReadingKey);
        assert_eq!(t.finish()["k"], " ");
    }

    proptest! {
        #[test]
        fn prop_quoted_value_round_trips(
            key in "[a-z_]{1,12}",
            value in r#"[a-zA-Z0-9 .,:/=_-]{0,24}"#,
            escaped in proptest::collection::vec(r#"[a-z ]{0,6}"#, 0..3),
        ) {
            // Interleave literal escaped quotes between plain chunks
            let mut expected = value.clone();
            for chunk in &escaped {
                expected.push_str(r#"\""#);
                expected.push_str(chunk);
            }
            let key = format!("k_{}", key);
            let line = format!(r#"{}="{}" tail=end"#, key, expected);

            let out = tokenize(&line);
            prop_assert_eq!(out.get(&key).map(String::as_str), Some(expected.as_str()));
        }
    }

    // ── Extraction ───────────────────────────────────────────────

    #[test]
    fn test_logfmt_extract_standard_line() {
        let entry = LogfmtParser.extract(
            r#"time=2024-01-02T15:04:05Z level=error msg="Connection timeout" service=worker duration=1.23"#,
        );

        assert_eq!(entry.timestamp, Utc.with_ymd_and_hms(2024, 1, 2, 15, 4, 5).unwrap());
        assert_eq!(entry.level, Level::Error);
        assert_eq!(entry.message, "Connection timeout");
        assert_eq!(entry.fields.len(), 2);
        assert_eq!(entry.field("service"), Some(&FieldValue::Text("worker".into())));
        assert_eq!(entry.field("duration"), Some(&FieldValue::Text("1.23".into())));
    }

    #[test]
    fn test_logfmt_missing_timestamp_defaults_to_now() {
        let before = Utc::now();
        let entry = LogfmtParser.extract("level=warn msg=slow");
        let after = Utc::now();

        assert!(entry.timestamp >= before && entry.timestamp <= after);
        assert_eq!(entry.level, Level::Warn);
    }

    #[test]
    fn test_logfmt_timestamp_key_order() {
        let entry = LogfmtParser.extract("ts=2024-01-03T00:00:00Z time=2024-01-02T00:00:00Z");
        assert_eq!(entry.timestamp, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        // The losing candidate stays as a field
        assert_eq!(entry.field("ts"), Some(&FieldValue::Text("2024-01-03T00:00:00Z".into())));
        assert!(entry.field("time").is_none());
    }

    #[test]
    fn test_logfmt_unparsable_timestamp_stays_in_fields() {
        let entry = LogfmtParser.extract("time=yesterday msg=hi");
        assert_eq!(entry.field("time"), Some(&FieldValue::Text("yesterday".into())));
    }

    #[test]
    fn test_logfmt_numeric_timestamp_string_is_not_epoch() {
        let entry = LogfmtParser.extract("ts=1704207845 msg=hi");
        assert!(entry.field("ts").is_some());
    }

    #[test]
    fn test_logfmt_level_defaults_to_info() {
        let entry = LogfmtParser.extract("msg=hello");
        assert_eq!(entry.level, Level::Info);

        let entry = LogfmtParser.extract("severity=error msg=hello");
        assert_eq!(entry.level, Level::Info);
        assert!(entry.field("severity").is_some());
    }

    #[test]
    fn test_logfmt_msg_preferred_over_message() {
        let entry = LogfmtParser.extract("message=second msg=first");
        assert_eq!(entry.message, "first");
        assert_eq!(entry.field("message"), Some(&FieldValue::Text("second".into())));
    }

    #[test]
    fn test_logfmt_line_without_pairs_still_yields_entry() {
        let entry = LogfmtParser.parse_line("just words").unwrap();
        assert_eq!(entry.message, "");
        assert_eq!(entry.level, Level::Info);
        assert!(entry.fields.is_empty());
        assert_eq!(LogfmtParser.policy(), ErrorPolicy::BestEffort);
    }
}
