//! Load: config loading from file and environment variables.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::model::LoglineConfig;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/logline/logline.toml";

impl LoglineConfig {
    /// Load configuration from file or environment variables
    /// Priority: Environment Variables > Config File > Defaults
    ///
    /// `path` wins over `LOGLINE_CONFIG_FILE`, which wins over
    /// [`DEFAULT_CONFIG_PATH`]. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// [`LoglineConfig::load`] with an explicit environment lookup.
    pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => env("LOGLINE_CONFIG_FILE")
                .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
                .into(),
        };

        let mut config = if config_path.exists() {
            tracing::info!("Loading configuration from: {}", config_path.display());
            Self::from_file(&config_path)?
        } else {
            tracing::debug!("Config file not found at {}, using environment variables", config_path.display());
            Self::default()
        };

        config.apply_env(env);
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: LoglineConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Overlay `LOGLINE_*` variables. Unparseable values are logged and ignored.
    pub fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = env("LOGLINE_FORMAT") {
            match raw.parse() {
                Ok(format) => self.format = format,
                Err(e) => tracing::warn!(error = %e, "ignoring LOGLINE_FORMAT"),
            }
        }
        if let Some(size) = env("LOGLINE_MAX_LINE_SIZE").and_then(|s| s.parse().ok()) {
            self.max_line_size = size;
        }
        if let Some(pretty) = env("LOGLINE_PRETTY").and_then(|s| s.parse().ok()) {
            self.pretty = pretty;
        }
        if let Some(stats) = env("LOGLINE_STATS").and_then(|s| s.parse().ok()) {
            self.stats = stats;
        }
    }

    /// Check configuration values are sane
    pub fn validate(&self) -> Result<(), String> {
        if self.max_line_size == 0 {
            return Err("max_line_size must be > 0".to_string());
        }
        Ok(())
    }
}
