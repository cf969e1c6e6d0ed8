// Domain-driven module structure for logline.

// Core
pub mod parser;
pub mod source;

// Process
pub mod conf;
pub mod runtime;

pub use parser::{detect_format, FieldValue, Level, LogEntry, LogFormat, ParseError, Parser};
