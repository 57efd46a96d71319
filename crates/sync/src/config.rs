//! Runtime configuration.

use anyhow::Context;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "pretty" or "json".
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Client-side ceiling on a serialized document, kept safely under the
    /// backend's hard per-document limit.
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,

    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,
}

impl LimitsConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: default_max_document_bytes(),
            write_timeout_secs: default_write_timeout(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_max_document_bytes() -> usize {
    shared::sanitize::MAX_DOCUMENT_BYTES
}

fn default_write_timeout() -> u64 {
    10
}

impl Config {
    /// Loads configuration from `config/popera.toml` (optional) overlaid
    /// with `POPERA__`-prefixed environment variables.
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/popera").required(false))
            .add_source(config::Environment::with_prefix("POPERA").separator("__"))
            .build()
            .context("failed to build configuration")?;
        config
            .try_deserialize()
            .context("failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(
            config.limits.max_document_bytes,
            shared::sanitize::MAX_DOCUMENT_BYTES
        );
        assert_eq!(config.limits.write_timeout(), Duration::from_secs(10));
    }
}
