//! Boot: logging init and config load.

use std::path::Path;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::conf::LoglineConfig;

/// Initialise the tracing / logging subsystem.
///
/// Diagnostics go to stderr; stdout carries records only.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load and validate configuration (file or env).
pub fn load_config(path: Option<&Path>) -> Result<LoglineConfig, Box<dyn std::error::Error>> {
    let config = LoglineConfig::load(path)?;
    config.validate()?;

    info!(
        "Loaded configuration: format={}, max_line_size={}",
        config.format, config.max_line_size
    );
    Ok(config)
}
