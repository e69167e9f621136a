use dashboards::config::{Config as ProvisionerConfig, ValidationError};
use serde::Deserialize;
use std::fs::File;

#[derive(Deserialize, Debug)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
    #[serde(default = "default_metrics_prefix")]
    pub prefix: String,
}

#[derive(Deserialize, Debug)]
pub struct LoggingConfig {
    pub sentry_dsn: Option<String>,
    /// Used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            sentry_dsn: None,
            level: default_log_level(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    pub metrics: Option<MetricsConfig>,
    pub provisioner: ProvisionerConfig,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data: Config = serde_yaml::from_reader(file)?;
        data.provisioner.validate()?;

        Ok(data)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    ValidationError(#[from] ValidationError),
}

fn default_metrics_prefix() -> String {
    "provisioner".into()
}

fn default_log_level() -> String {
    "info".into()
}
