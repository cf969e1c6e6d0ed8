use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::LogFormat;

/// Error categories for metrics recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricErrorType {
    /// Structured line failed to decode (aborts a JSON batch)
    Decode,
    /// Line exceeded the configured maximum size
    TooLarge,
    /// Best-effort extractor errored; the raw line was kept as the message
    RawFallback,
}

/// A wrapper that forces the wrapped data onto its own cache line(s).
///
/// 64 bytes is the cache line size on x86-64 and most ARM64 parts.
#[repr(align(64))]
#[derive(Debug, Default)]
pub struct CacheAligned<T>(pub T);

/// Detection runs and what they settled on
#[derive(Debug, Default)]
pub struct DetectionMetrics {
    pub attempts: AtomicU64,
    pub json: AtomicU64,
    pub logfmt: AtomicU64,
    pub text: AtomicU64,
}

/// Lines extracted per format (updated once per line)
#[derive(Debug, Default)]
pub struct FormatMetrics {
    pub json: AtomicU64,
    pub logfmt: AtomicU64,
    pub text: AtomicU64,
}

#[derive(Debug, Default)]
pub struct TotalMetrics {
    pub time_nanos: AtomicU64,
    pub count: AtomicU64,
}

#[derive(Debug, Default)]
pub struct ErrorMetrics {
    pub decode: AtomicU64,
    pub too_large: AtomicU64,
    pub raw_fallback: AtomicU64,
}

/// Metrics for parsing operations.
///
/// Each group sits on its own cache line so concurrent parsers updating
/// different groups don't contend. All operations use `Ordering::Relaxed`;
/// `snapshot()` reads are not atomic across fields and may tear slightly.
#[derive(Debug, Default)]
pub struct ParsingMetrics {
    pub detection: CacheAligned<DetectionMetrics>,

    /// Hottest group, touched per line
    pub formats: CacheAligned<FormatMetrics>,

    pub totals: CacheAligned<TotalMetrics>,

    pub errors: CacheAligned<ErrorMetrics>,
}

impl ParsingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a detection run and its outcome
    #[inline]
    pub fn record_detection(&self, detected: LogFormat) {
        self.detection.0.attempts.fetch_add(1, Ordering::Relaxed);
        match detected {
            LogFormat::Json => self.detection.0.json.fetch_add(1, Ordering::Relaxed),
            LogFormat::Logfmt => self.detection.0.logfmt.fetch_add(1, Ordering::Relaxed),
            LogFormat::Text | LogFormat::Auto => {
                self.detection.0.text.fetch_add(1, Ordering::Relaxed)
            }
        };
    }

    /// Record one extracted line
    #[inline]
    pub fn record_parse(&self, format: LogFormat, time_nanos: u64) {
        self.totals.0.count.fetch_add(1, Ordering::Relaxed);
        self.totals.0.time_nanos.fetch_add(time_nanos, Ordering::Relaxed);

        match format {
            LogFormat::Json => self.formats.0.json.fetch_add(1, Ordering::Relaxed),
            LogFormat::Logfmt => self.formats.0.logfmt.fetch_add(1, Ordering::Relaxed),
            LogFormat::Text | LogFormat::Auto => {
                self.formats.0.text.fetch_add(1, Ordering::Relaxed)
            }
        };
    }

    #[inline]
    pub fn record_error(&self, error_type: MetricErrorType) {
        match error_type {
            MetricErrorType::Decode => self.errors.0.decode.fetch_add(1, Ordering::Relaxed),
            MetricErrorType::TooLarge => self.errors.0.too_large.fetch_add(1, Ordering::Relaxed),
            MetricErrorType::RawFallback => {
                self.errors.0.raw_fallback.fetch_add(1, Ordering::Relaxed)
            }
        };
    }

    /// Point-in-time copy of every counter, with derived rates.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_parsed = self.totals.0.count.load(Ordering::Relaxed);
        let total_time_ns = self.totals.0.time_nanos.load(Ordering::Relaxed);

        let decode_errors = self.errors.0.decode.load(Ordering::Relaxed);
        let lines_too_large = self.errors.0.too_large.load(Ordering::Relaxed);
        let raw_fallbacks = self.errors.0.raw_fallback.load(Ordering::Relaxed);

        // Raw fallbacks still produce a record and are already in total_parsed
        let total_attempts = total_parsed + decode_errors + lines_too_large;

        MetricsSnapshot {
            detection_attempts: self.detection.0.attempts.load(Ordering::Relaxed),
            detected_json: self.detection.0.json.load(Ordering::Relaxed),
            detected_logfmt: self.detection.0.logfmt.load(Ordering::Relaxed),
            detected_text: self.detection.0.text.load(Ordering::Relaxed),

            json_parsed: self.formats.0.json.load(Ordering::Relaxed),
            logfmt_parsed: self.formats.0.logfmt.load(Ordering::Relaxed),
            text_parsed: self.formats.0.text.load(Ordering::Relaxed),

            total_parsed,
            avg_parse_time_us: if total_parsed > 0 {
                (total_time_ns as f64 / total_parsed as f64) / 1000.0
            } else {
                0.0
            },

            decode_errors,
            lines_too_large,
            raw_fallbacks,
            success_rate: if total_attempts > 0 {
                total_parsed as f64 / total_attempts as f64
            } else {
                1.0
            },
        }
    }
}

/// A read-only snapshot of parsing metrics, serializable for `--stats`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    // Detection
    pub detection_attempts: u64,
    pub detected_json: u64,
    pub detected_logfmt: u64,
    pub detected_text: u64,

    // Format counts
    pub json_parsed: u64,
    pub logfmt_parsed: u64,
    pub text_parsed: u64,

    // Performance
    pub total_parsed: u64,
    pub avg_parse_time_us: f64,

    // Errors
    pub decode_errors: u64,
    pub lines_too_large: u64,
    pub raw_fallbacks: u64,
    pub success_rate: f64,
}
