//! Log parsing and normalization module
//!
//! Turns batches of raw log lines into normalized [`LogEntry`] records.
//!
//! # Architecture
//!
//! - `traits.rs`: Core traits for detectors and extractors
//! - `model.rs`: Records, formats, levels, and errors
//! - `normalize.rs`: Level canonicalization and timestamp layouts
//! - `detector.rs`: Sample-based format detection
//! - `formats/`: JSON, logfmt, and free-text extractors
//! - `dispatch.rs`: Batch parser tying detection and extraction together
//! - `metrics.rs`: Parsing counters
//!
//! # Failure model
//!
//! - JSON batches are fail-fast: one undecodable line aborts the batch
//! - Logfmt and text are best-effort: every line yields a record
//! - Unparseable timestamps and unknown levels fall back to defaults
//! - Stream reads enforce a line size limit (see [`MAX_LINE_SIZE`])

pub mod traits;
pub mod model;
pub mod normalize;
pub mod detector;
pub mod formats;
pub mod dispatch;
pub mod metrics;

// Re-export commonly used types
pub use detector::detect_format;
pub use dispatch::Parser;
pub use model::{FieldValue, Level, LogEntry, LogFormat, ParseError};
pub use normalize::{normalize_level, parse_timestamp};
pub use traits::{ErrorPolicy, LogParser};

// Constants
pub const MAX_LINE_SIZE: usize = 1_048_576; // 1MB
pub const DETECTION_SAMPLE_SIZE: usize = 10; // Leading lines sampled for detection
