//! Startup orchestration.
//!
//! # Responsibilities
//! - Connect the configured contact store
//! - Build the shared middleware state (CSRF, rate limiter, origin policy)
//! - Hand everything to the server as one explicit context
//!
//! # Design Decisions
//! - Fail fast: a store that cannot be reached at startup is fatal
//! - Teardown is the mirror of `connect` and runs after the server stops

use std::sync::Arc;

use crate::config::{AppConfig, StoreKind};
use crate::http::response::Pages;
use crate::security::{CsrfProtection, OriginPolicy, RateLimiterState};
use crate::storage::{ContactStore, MemoryStore, MongoStore, StoreError};

/// Everything a running server needs, built once at startup.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ContactStore>,
    pub csrf: Arc<CsrfProtection>,
    pub rate_limiter: Arc<RateLimiterState>,
    pub origin_policy: Arc<OriginPolicy>,
    pub pages: Arc<Pages>,
}

impl AppContext {
    /// Assemble a context around an already-connected store.
    pub fn new(config: AppConfig, store: Arc<dyn ContactStore>) -> Self {
        let csrf = CsrfProtection::new(config.csrf.clone(), config.security.max_body_size);
        let rate_limiter = RateLimiterState::new(&config.rate_limit);
        let origin_policy = OriginPolicy::new(&config.cors);
        let pages = Pages::new(&config.site);

        Self {
            config: Arc::new(config),
            store,
            csrf: Arc::new(csrf),
            rate_limiter: Arc::new(rate_limiter),
            origin_policy: Arc::new(origin_policy),
            pages: Arc::new(pages),
        }
    }

    /// Connect the store selected by `database.kind` and build the context.
    pub async fn connect(config: AppConfig) -> Result<Self, StoreError> {
        let store: Arc<dyn ContactStore> = match config.database.kind {
            StoreKind::Mongo => Arc::new(MongoStore::connect(&config.database).await?),
            StoreKind::Memory => {
                tracing::warn!("Using in-memory contact store; submissions are not persisted");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::new(config, store))
    }

    /// Release the store's connections.
    pub async fn teardown(&self) {
        self.store.disconnect().await;
        tracing::info!("Contact store disconnected");
    }
}
