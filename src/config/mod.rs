//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (PORT / MONGODB_URI overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, EnvOverrides};
pub use schema::{
    AppConfig, CorsConfig, CsrfConfig, DatabaseConfig, HeadersConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, RateLimitConfig, SameSitePolicy, SiteConfig, StoreKind,
};
