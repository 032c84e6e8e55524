//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values read from the process environment that override file settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    /// `PORT`: listen on all interfaces at this port.
    pub port: Option<String>,
    /// `MONGODB_URI`: document store connection string.
    pub mongodb_uri: Option<String>,
}

impl EnvOverrides {
    /// Read overrides from the current process environment.
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT").ok().filter(|v| !v.is_empty()),
            mongodb_uri: std::env::var("MONGODB_URI").ok().filter(|v| !v.is_empty()),
        }
    }

    /// Apply the overrides on top of a parsed configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(port) = &self.port {
            config.listener.bind_address = format!("0.0.0.0:{}", port);
        }
        if let Some(uri) = &self.mongodb_uri {
            config.database.uri = uri.clone();
        }
    }
}

/// Load a TOML file (or defaults when `path` is `None`), apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>, env: &EnvOverrides) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    env.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
