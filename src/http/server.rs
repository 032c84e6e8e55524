//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the page, token and submission handlers
//! - Wire up the security chain and the ambient layers
//! - Run the rate-limit sweep alongside the server
//! - Serve until the shutdown signal, then drain
//!
//! # Layer order (outermost first)
//! ```text
//! request id / trace → body limit → security headers → catch-panic
//!     → CORS (preflight + response headers) → origin guard → CSRF → rate limit → handler
//! ```
//!
//! No request deadline wraps the handler; a slow store write runs to completion
//! and is answered with the success or failure page.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer};

use crate::config::AppConfig;
use crate::http::error::GENERIC_FAILURE;
use crate::http::request::with_request_tracing;
use crate::http::response::Pages;
use crate::http::{contact, pages};
use crate::lifecycle::AppContext;
use crate::security::headers::apply_security_headers;
use crate::security::{
    csrf_middleware, origin_guard_middleware, rate_limit_middleware, RateLimiterState,
};
use crate::storage::ContactStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pages: Arc<Pages>,
    pub store: Arc<dyn ContactStore>,
}

/// HTTP server for the portfolio site.
pub struct HttpServer {
    router: Router,
    config: Arc<AppConfig>,
    rate_limiter: Arc<RateLimiterState>,
}

impl HttpServer {
    pub fn new(context: &AppContext) -> Self {
        let state = AppState {
            pages: context.pages.clone(),
            store: context.store.clone(),
        };

        Self {
            router: Self::build_router(context, state),
            config: context.config.clone(),
            rate_limiter: context.rate_limiter.clone(),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(context: &AppContext, state: AppState) -> Router {
        let routes = Router::new()
            .route("/", get(pages::index).post(contact::submit))
            .route("/csrf-token", get(pages::csrf_token))
            .with_state(state);

        Self::with_layers(routes, context)
    }

    /// Wrap `routes` in the security chain and the ambient layers.
    fn with_layers(routes: Router, context: &AppContext) -> Router {
        let config = &context.config;
        let mut router = routes;

        if config.rate_limit.enabled {
            router = router.layer(from_fn_with_state(
                context.rate_limiter.clone(),
                rate_limit_middleware,
            ));
        }

        let router = router
            .layer(from_fn_with_state(context.csrf.clone(), csrf_middleware))
            .layer(from_fn_with_state(
                context.origin_policy.clone(),
                origin_guard_middleware,
            ))
            .layer(context.origin_policy.layer(&config.cors))
            .layer(CatchPanicLayer::custom(handle_panic));

        let router = apply_security_headers(router, &config.headers)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size));

        with_request_tracing(router)
    }

    /// The router with every layer applied, for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            store = ?self.config.database.kind,
            rate_limit = self.config.rate_limit.enabled,
            "HTTP server starting"
        );

        if self.config.rate_limit.enabled {
            let interval = Duration::from_secs(self.config.rate_limit.sweep_interval_secs.max(1));
            tokio::spawn(sweep_rate_limits(
                self.rate_limiter.clone(),
                interval,
                shutdown.resubscribe(),
            ));
        }

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Periodically drop expired rate-limit windows.
async fn sweep_rate_limits(
    limiter: Arc<RateLimiterState>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = limiter.sweep();
                if removed > 0 {
                    tracing::debug!(
                        removed,
                        remaining = limiter.tracked_clients(),
                        "Swept expired rate-limit windows"
                    );
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE).into_response()
}
