//! Per-format detectors and extractors

pub mod json;
pub mod logfmt;
pub mod text;

pub use json::{JsonDetector, JsonParser};
pub use logfmt::{tokenize, LogfmtDetector, LogfmtParser, TokenState, Tokenizer};
pub use text::{TextDetector, TextParser, TextPattern, PATTERNS};
