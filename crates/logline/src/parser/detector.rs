use super::formats::*;
use super::traits::*;
use super::DETECTION_SAMPLE_SIZE;

/// Per-format vote counts over a detection sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionScores {
    pub json: usize,
    pub logfmt: usize,
    /// Every sampled line counts here, whatever else it matched
    pub text: usize,
}

impl DetectionScores {
    /// Pick a format from the votes.
    ///
    /// JSON needs to beat logfmt and half the sample; logfmt only needs half.
    /// Halves use integer division, so 5 of 10 lines is not enough.
    pub fn decide(&self) -> LogFormat {
        let half = self.text / 2;
        if self.json > self.logfmt && self.json > half {
            LogFormat::Json
        } else if self.logfmt > half {
            LogFormat::Logfmt
        } else {
            LogFormat::Text
        }
    }
}

/// Format detector orchestrator
///
/// Runs every detector over the first [`DETECTION_SAMPLE_SIZE`] lines and
/// votes. Logfmt lines without one of the well-known keys (`level`, `msg`,
/// `time`, `timestamp`) do not vote for logfmt and end up as text.
pub struct FormatDetectorOrchestrator {
    detectors: Vec<Box<dyn FormatDetector>>,
}

impl FormatDetectorOrchestrator {
    pub fn new() -> Self {
        let detectors: Vec<Box<dyn FormatDetector>> = vec![
            Box::new(JsonDetector),
            Box::new(LogfmtDetector),
            Box::new(TextDetector), // Fallback, matches everything
        ];

        Self { detectors }
    }

    pub fn score<S: AsRef<str>>(&self, lines: &[S]) -> DetectionScores {
        let sample = &lines[..lines.len().min(DETECTION_SAMPLE_SIZE)];
        let mut scores = DetectionScores::default();

        for line in sample {
            let line = line.as_ref();
            for detector in &self.detectors {
                if !detector.matches(line) {
                    continue;
                }
                match detector.format() {
                    LogFormat::Json => scores.json += 1,
                    LogFormat::Logfmt => scores.logfmt += 1,
                    LogFormat::Text => scores.text += 1,
                    LogFormat::Auto => {}
                }
            }
        }

        scores
    }

    pub fn detect<S: AsRef<str>>(&self, lines: &[S]) -> LogFormat {
        if lines.is_empty() {
            return LogFormat::Text;
        }

        let scores = self.score(lines);
        let format = scores.decide();
        tracing::debug!(
            json = scores.json,
            logfmt = scores.logfmt,
            text = scores.text,
            %format,
            "detected log format"
        );
        format
    }
}

impl Default for FormatDetectorOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Guess the format of a batch from its leading lines. Empty input is text.
pub fn detect_format<S: AsRef<str>>(lines: &[S]) -> LogFormat {
    FormatDetectorOrchestrator::new().detect(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn repeat(line: &str, n: usize) -> Vec<String> {
        vec![line.to_string(); n]
    }

    #[test]
    fn test_detect_empty_is_text() {
        assert_eq!(detect_format::<String>(&[]), LogFormat::Text);
    }

    #[test]
    fn test_detect_json() {
        let sample = repeat(r#"{"level":"info","msg":"hello"}"#, 10);
        assert_eq!(detect_format(&sample), LogFormat::Json);
    }

    #[test]
    fn test_detect_logfmt() {
        let sample = repeat("level=info msg=hello ts=2024-01-02T15:04:05Z", 10);
        assert_eq!(detect_format(&sample), LogFormat::Logfmt);
    }

    #[test]
    fn test_detect_bracketed_text() {
        let sample = repeat("[INFO] Starting application", 10);
        assert_eq!(detect_format(&sample), LogFormat::Text);
    }

    #[test]
    fn test_single_line_batches() {
        assert_eq!(detect_format(&lines(&[r#"{"a":1}"#])), LogFormat::Json);
        assert_eq!(detect_format(&lines(&["msg=hi"])), LogFormat::Logfmt);
        assert_eq!(detect_format(&lines(&["hello"])), LogFormat::Text);
    }

    #[test]
    fn test_only_first_ten_lines_are_sampled() {
        let mut sample = repeat("plain text", 10);
        sample.extend(repeat(r#"{"level":"info"}"#, 50));

        let scores = FormatDetectorOrchestrator::new().score(&sample);
        assert_eq!(scores, DetectionScores { json: 0, logfmt: 0, text: 10 });
        assert_eq!(detect_format(&sample), LogFormat::Text);
    }

    #[test]
    fn test_half_uses_integer_division() {
        // 5 of 10 is not more than half
        let mut sample = repeat(r#"{"a":1}"#, 5);
        sample.extend(repeat("plain", 5));
        assert_eq!(detect_format(&sample), LogFormat::Text);

        // 2 of 3: half is 1
        let sample = lines(&[r#"{"a":1}"#, r#"{"b":2}"#, "plain"]);
        assert_eq!(detect_format(&sample), LogFormat::Json);
    }

    #[test]
    fn test_json_must_beat_logfmt() {
        // A JSON line containing `"msg="` text also votes for logfmt
        let sample = repeat(r#"{"note":"msg=x"}"#, 4);
        let scores = FormatDetectorOrchestrator::new().score(&sample);

        assert_eq!(scores, DetectionScores { json: 4, logfmt: 4, text: 4 });
        assert_eq!(scores.decide(), LogFormat::Logfmt);
    }

    #[test]
    fn test_logfmt_without_marker_keys_is_text() {
        let sample = repeat("service=api duration=12ms status=200", 10);
        assert_eq!(detect_format(&sample), LogFormat::Text);
    }

    #[test]
    fn test_mixed_majority_json() {
        let sample = lines(&[
            r#"{"level":"info","msg":"one"}"#,
            "Starting application...",
            r#"{"level":"warn","msg":"two"}"#,
            r#"{"level":"error","msg":"three"}"#,
        ]);
        assert_eq!(detect_format(&sample), LogFormat::Json);
    }
}
