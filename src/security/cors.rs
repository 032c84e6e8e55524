//! Cross-origin policy.
//!
//! Two pieces: a guard that refuses requests whose `Origin` is not on the
//! allow-list, and a `tower_http` CORS layer that answers preflights and adds
//! `Access-Control-*` headers for listed origins.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::CorsConfig;
use crate::observability::metrics;

/// Allow-list shared by the guard.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Vec<HeaderValue>,
}

impl OriginPolicy {
    pub fn new(config: &CorsConfig) -> Self {
        let allowed = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring unusable CORS origin");
                    None
                }
            })
            .collect();
        Self { allowed }
    }

    /// Requests without an `Origin` header are same-origin or non-browser
    /// and pass.
    pub fn permits(&self, origin: Option<&HeaderValue>) -> bool {
        match origin {
            Some(origin) => self.allowed.iter().any(|allowed| allowed == origin),
            None => true,
        }
    }

    /// Build the response-side CORS layer.
    pub fn layer(&self, config: &CorsConfig) -> CorsLayer {
        if self.allowed.is_empty() {
            tracing::warn!("No CORS origins configured; cross-origin requests will be refused");
        }
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(self.allowed.clone()))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::HeaderName::from_static("csrf-token"),
                header::HeaderName::from_static("x-csrf-token"),
            ])
            .allow_credentials(config.allow_credentials)
    }
}

/// Refuse requests from origins outside the allow-list.
pub async fn origin_guard_middleware(
    State(policy): State<Arc<OriginPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let origin = request.headers().get(header::ORIGIN);
    if !policy.permits(origin) {
        tracing::warn!(
            origin = ?origin,
            method = %request.method(),
            path = %request.uri().path(),
            "Origin not allowed"
        );
        metrics::record_rejection("cors");
        return (StatusCode::FORBIDDEN, "Not allowed by CORS").into_response();
    }
    next.run(request).await
}
