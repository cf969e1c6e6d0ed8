//! Model: LoglineConfig.

use serde::{Deserialize, Serialize};

use crate::parser::{LogFormat, MAX_LINE_SIZE};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoglineConfig {
    /// Input format, or `auto` to detect per batch
    pub format: LogFormat,
    /// Longest accepted input line in bytes, terminator excluded
    pub max_line_size: usize,
    /// Pretty-print output records
    pub pretty: bool,
    /// Log a metrics snapshot after the run
    pub stats: bool,
}

impl Default for LoglineConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Auto,
            max_line_size: MAX_LINE_SIZE,
            pretty: false,
            stats: false,
        }
    }
}
