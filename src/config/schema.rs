//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the portfolio server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Document store connection settings.
    pub database: DatabaseConfig,

    /// Location of the static pages served by the front door.
    pub site: SiteConfig,

    /// Cross-origin allow-list.
    pub cors: CorsConfig,

    /// Anti-forgery token settings.
    pub csrf: CsrfConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Security response headers.
    pub headers: HeadersConfig,

    /// Request size limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Which persistence backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// MongoDB via the official driver.
    Mongo,
    /// In-process store; records are lost on restart.
    Memory,
}

/// Document store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub kind: StoreKind,

    /// Connection string (`mongodb://` or `mongodb+srv://`).
    pub uri: String,

    /// Database name.
    pub database: String,

    /// Collection holding contact submissions.
    pub collection: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Mongo,
            uri: "mongodb://localhost:27017".to_string(),
            database: "portfolio".to_string(),
            collection: "contacts".to_string(),
        }
    }
}

/// Static page locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Directory holding the page files.
    pub root: String,
    pub index_page: String,
    pub success_page: String,
    pub failure_page: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: "site".to_string(),
            index_page: "index.html".to_string(),
            success_page: "success.html".to_string(),
            failure_page: "failure.html".to_string(),
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to call the server (scheme + host, no path).
    pub allowed_origins: Vec<String>,

    /// Allow cookies on cross-origin requests.
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "https://agbonifo.github.io".to_string(),
                "https://agbonifo-github-io.vercel.app".to_string(),
            ],
            allow_credentials: true,
        }
    }
}

/// SameSite attribute for the secret cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Strict,
    Lax,
    None,
}

/// CSRF configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Cookie holding the token secret.
    pub cookie_name: String,
    pub cookie_path: String,
    pub cookie_secure: bool,
    pub cookie_http_only: bool,
    pub cookie_same_site: SameSitePolicy,

    /// Form field carrying the token on submission.
    pub form_field: String,

    /// Paths that never require a token.
    pub exempt_paths: Vec<String>,

    /// Number of random bytes in a fresh secret.
    pub secret_length: usize,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            cookie_name: "_csrf".to_string(),
            cookie_path: "/".to_string(),
            cookie_secure: true,
            cookie_http_only: true,
            cookie_same_site: SameSitePolicy::None,
            form_field: "_csrf".to_string(),
            exempt_paths: vec!["/csrf-token".to_string()],
            secret_length: 18,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per client per window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Number of reverse proxies in front of the server whose
    /// `X-Forwarded-For` entries are trusted. Zero (the default) uses the
    /// peer address; set it only when a proxy always rewrites the header.
    pub trust_proxy_hops: usize,

    /// How often expired client entries are purged, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_secs: 15 * 60,
            trust_proxy_hops: 0,
            sweep_interval_secs: 60,
        }
    }
}

/// A single Content-Security-Policy directive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CspDirective {
    pub name: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl CspDirective {
    fn new(name: &str, sources: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Security header configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeadersConfig {
    /// Enable security headers.
    pub enabled: bool,

    /// Content-Security-Policy directives, emitted in order.
    pub csp: Vec<CspDirective>,

    /// HSTS max-age in seconds.
    pub hsts_max_age_secs: u64,
    pub hsts_include_subdomains: bool,
}

impl Default for HeadersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            csp: vec![
                CspDirective::new("default-src", &["'self'"]),
                CspDirective::new(
                    "script-src",
                    &["'self'", "https://unpkg.com", "https://vercel.live", "'unsafe-inline'"],
                ),
                CspDirective::new(
                    "style-src",
                    &[
                        "'self'",
                        "'unsafe-inline'",
                        "https://fonts.googleapis.com",
                        "https://cdnjs.cloudflare.com",
                        "https://fontawesome.com",
                    ],
                ),
                CspDirective::new(
                    "font-src",
                    &[
                        "'self'",
                        "https://fonts.gstatic.com",
                        "https://cdnjs.cloudflare.com",
                        "https://fontawesome.com",
                        "data:",
                    ],
                ),
                CspDirective::new("connect-src", &["'self'", "https://fontawesome.com"]),
                CspDirective::new("img-src", &["'self'", "data:"]),
                CspDirective::new("base-uri", &["'self'"]),
                CspDirective::new("form-action", &["'self'"]),
                CspDirective::new("frame-ancestors", &["'self'"]),
                CspDirective::new("object-src", &["'none'"]),
                CspDirective::new("script-src-attr", &["'none'"]),
                CspDirective::new("upgrade-insecure-requests", &[]),
            ],
            hsts_max_age_secs: 31_536_000,
            hsts_include_subdomains: true,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 100 * 1024,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
