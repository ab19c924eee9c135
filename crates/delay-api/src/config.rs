//! Service configuration

use anyhow::{Context, Result};
use config::{builder::DefaultState, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable naming an optional configuration file
pub const CONFIG_FILE_ENV: &str = "DELAY_CONFIG";

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address to bind
    pub host: String,

    pub port: u16,

    /// Airport dataset (CSV)
    pub airports_path: PathBuf,

    /// Model bundle (JSON)
    pub model_path: PathBuf,

    /// `*` or a comma-separated list of allowed origins
    pub cors_origins: String,

    /// Retry initialization from request handlers while not ready
    pub lazy_init: bool,

    /// Instance name attached to structured log events
    pub instance_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            airports_path: PathBuf::from("data/airports.csv"),
            model_path: PathBuf::from("models/model.json"),
            cors_origins: "*".to_string(),
            lazy_init: true,
            instance_name: "delay-api".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional file and `DELAY_*` environment variables
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            builder = builder.add_source(File::with_name(&path));
        }
        let builder = builder.add_source(Environment::with_prefix("DELAY").try_parsing(true));
        Self::from_builder(builder)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Allowed CORS origins, or `None` when any origin is allowed
    pub fn allowed_origins(&self) -> Option<Vec<String>> {
        let origins: Vec<String> = self
            .cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            None
        } else {
            Some(origins)
        }
    }
}
