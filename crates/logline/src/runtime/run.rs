//! Run: parse one input stream and write records out as JSON lines.

use std::io::{BufRead, Write};
use std::sync::Arc;

use tracing::info;

use crate::conf::LoglineConfig;
use crate::parser::metrics::{MetricsSnapshot, ParsingMetrics};
use crate::parser::Parser;

/// Parse `input` with the configured format and write one JSON record per
/// line to `out`.
///
/// Nothing is written when the batch fails. Returns the metrics gathered
/// during the run.
pub fn run<R: BufRead, W: Write>(
    config: &LoglineConfig,
    input: R,
    mut out: W,
) -> Result<MetricsSnapshot, Box<dyn std::error::Error>> {
    let metrics = Arc::new(ParsingMetrics::new());
    let parser = Parser::with_format(config.format)
        .with_max_line_size(config.max_line_size)
        .with_metrics(Arc::clone(&metrics));

    let entries = parser.parse(input)?;

    for entry in &entries {
        if config.pretty {
            serde_json::to_writer_pretty(&mut out, entry)?;
        } else {
            serde_json::to_writer(&mut out, entry)?;
        }
        out.write_all(b"\n")?;
    }
    out.flush()?;

    let snapshot = metrics.snapshot();
    if config.stats {
        info!(
            "Parsed {} lines ({} json, {} logfmt, {} text) at {:.2} us/line",
            snapshot.total_parsed,
            snapshot.json_parsed,
            snapshot.logfmt_parsed,
            snapshot.text_parsed,
            snapshot.avg_parse_time_us
        );
        info!(stats = %serde_json::to_string(&snapshot)?, "parsing metrics");
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::LogFormat;
    use std::io::Cursor;

    fn run_str(config: &LoglineConfig, input: &str) -> (Result<MetricsSnapshot, String>, String) {
        let mut out = Vec::new();
        let result = run(config, Cursor::new(input), &mut out).map_err(|e| e.to_string());
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_run_writes_json_lines() {
        let config = LoglineConfig::default();
        let (result, out) = run_str(&config, "level=warn msg=\"disk full\" host=a\nlevel=info msg=ok\n");

        let snap = result.unwrap();
        assert_eq!(snap.logfmt_parsed, 2);

        let records: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["level"], "WARN");
        assert_eq!(records[0]["message"], "disk full");
        assert_eq!(records[0]["fields"]["host"], "a");
        assert!(records[1].get("fields").is_none());
    }

    #[test]
    fn test_run_pretty() {
        let config = LoglineConfig {
            pretty: true,
            ..Default::default()
        };
        let (result, out) = run_str(&config, "[INFO] hi");

        assert!(result.is_ok());
        assert!(out.contains("\n  \"level\": \"INFO\""));
    }

    #[test]
    fn test_run_failure_writes_nothing() {
        let config = LoglineConfig {
            format: LogFormat::Json,
            ..Default::default()
        };
        let (result, out) = run_str(&config, "{\"msg\":\"ok\"}\n{invalid}\n");

        let err = result.unwrap_err();
        assert!(err.starts_with("line 2:"), "unexpected error: {}", err);
        assert!(out.is_empty());
    }

    #[test]
    fn test_run_empty_input() {
        let (result, out) = run_str(&LoglineConfig::default(), "");
        assert_eq!(result.unwrap().total_parsed, 0);
        assert!(out.is_empty());
    }
}
