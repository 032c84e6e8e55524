//! Configuration validation.
//!
//! Serde handles syntax; this module checks values that parse but cannot work
//! at runtime. Validation is a pure function that reports every problem, not
//! just the first.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{AppConfig, SameSitePolicy, StoreKind};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("cors.allowed_origins entry `{0}` is not an http(s) origin")]
    Origin(String),

    #[error("rate_limit.{0} must be greater than zero")]
    ZeroLimit(&'static str),

    #[error("database.uri must start with mongodb:// or mongodb+srv://")]
    DatabaseUri,

    #[error("database.{0} must not be empty")]
    EmptyDatabaseField(&'static str),

    #[error("csrf.cookie_name `{0}` is not a valid cookie name")]
    CookieName(String),

    #[error("csrf.cookie_same_site = \"none\" requires csrf.cookie_secure = true")]
    InsecureSameSiteNone,

    #[error("csrf.secret_length must be at least 16 bytes")]
    ShortSecret,

    #[error("security.max_body_size must be greater than zero")]
    ZeroBodySize,

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    for origin in &config.cors.allowed_origins {
        if !is_origin(origin) {
            errors.push(ValidationError::Origin(origin.clone()));
        }
    }

    if config.rate_limit.enabled {
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError::ZeroLimit("max_requests"));
        }
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::ZeroLimit("window_secs"));
        }
        if config.rate_limit.sweep_interval_secs == 0 {
            errors.push(ValidationError::ZeroLimit("sweep_interval_secs"));
        }
    }

    if config.database.kind == StoreKind::Mongo {
        let uri = &config.database.uri;
        if !(uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://")) {
            errors.push(ValidationError::DatabaseUri);
        }
        if config.database.database.is_empty() {
            errors.push(ValidationError::EmptyDatabaseField("database"));
        }
        if config.database.collection.is_empty() {
            errors.push(ValidationError::EmptyDatabaseField("collection"));
        }
    }

    let name = &config.csrf.cookie_name;
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        errors.push(ValidationError::CookieName(name.clone()));
    }
    if config.csrf.cookie_same_site == SameSitePolicy::None && !config.csrf.cookie_secure {
        errors.push(ValidationError::InsecureSameSiteNone);
    }
    if config.csrf.secret_length < 16 {
        errors.push(ValidationError::ShortSecret);
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodySize);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// An origin is scheme + host (+ port) with nothing after it.
fn is_origin(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some()
                && url.path() == "/"
                && !value.ends_with('/')
                && url.query().is_none()
                && url.fragment().is_none()
        }
        Err(_) => false,
    }
}
