//! Anti-forgery tokens bound to a cookie-held secret.
//!
//! # Scheme
//! - The secret is random bytes, base64url, stored in an http-only cookie
//! - A token is `salt-digest` with `digest = base64url(sha256(salt "-" secret))`
//! - Every issuance uses a fresh salt; any token minted from the current
//!   secret verifies
//!
//! # Request Flow
//! ```text
//! safe method or exempt path → pass, attach CsrfGuard
//! otherwise:
//!     token from csrf-token / xsrf-token / x-csrf-token / x-xsrf-token header
//!     else from the `_csrf` field of a urlencoded or JSON body (buffered, then restored)
//!     no cookie, no token, or mismatch → 403
//! new secret → Set-Cookie on the response
//! ```

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use cookie::{Cookie, SameSite};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng, RngCore};
use sha2::{Digest, Sha256};

use crate::config::{CsrfConfig, SameSitePolicy};
use crate::observability::metrics;

const SALT_LENGTH: usize = 8;

/// Headers checked for a token, in order.
const TOKEN_HEADERS: [&str; 4] = ["csrf-token", "xsrf-token", "x-csrf-token", "x-xsrf-token"];

/// Mint a token for `secret`.
pub fn mint_token(secret: &str) -> String {
    let salt: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect();
    format!("{}-{}", salt, digest(&salt, secret))
}

/// Check `token` was minted from `secret`.
pub fn verify_token(secret: &str, token: &str) -> bool {
    let Some((salt, given)) = token.split_once('-') else {
        return false;
    };
    if salt.is_empty() {
        return false;
    }
    constant_time_eq(digest(salt, secret).as_bytes(), given.as_bytes())
}

fn digest(salt: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"-");
    hasher.update(secret.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Shared CSRF settings used by the middleware.
pub struct CsrfProtection {
    config: CsrfConfig,
    max_body_size: usize,
}

impl CsrfProtection {
    pub fn new(config: CsrfConfig, max_body_size: usize) -> Self {
        Self {
            config,
            max_body_size,
        }
    }

    fn generate_secret(&self) -> String {
        let mut bytes = vec![0u8; self.config.secret_length];
        OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    fn is_exempt(&self, path: &str) -> bool {
        self.config.exempt_paths.iter().any(|p| p == path)
    }

    fn read_secret(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|c| c.name() == self.config.cookie_name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    fn same_site(&self) -> SameSite {
        match self.config.cookie_same_site {
            SameSitePolicy::Strict => SameSite::Strict,
            SameSitePolicy::Lax => SameSite::Lax,
            SameSitePolicy::None => SameSite::None,
        }
    }

    fn cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.config.cookie_name.clone(), value))
            .path(self.config.cookie_path.clone())
            .secure(self.config.cookie_secure)
            .http_only(self.config.cookie_http_only)
            .same_site(self.same_site())
            .build()
    }

    /// `Set-Cookie` value delivering `secret`.
    pub fn secret_cookie(&self, secret: &str) -> String {
        self.cookie(secret.to_string()).to_string()
    }

    /// `Set-Cookie` value that deletes the secret.
    pub fn removal_cookie(&self) -> String {
        let mut cookie = self.cookie(String::new());
        cookie.make_removal();
        cookie.to_string()
    }

    /// Find the submitted token, buffering the body when needed. The request
    /// is rebuilt with the same body for downstream handlers.
    async fn extract_token(
        &self,
        request: Request<Body>,
    ) -> Result<(Request<Body>, Option<String>), Response> {
        if let Some(token) = TOKEN_HEADERS.iter().find_map(|name| {
            request
                .headers()
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        }) {
            return Ok((request, Some(token)));
        }

        let content_type = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let is_form = content_type.starts_with("application/x-www-form-urlencoded");
        let is_json = content_type.starts_with("application/json");
        if !is_form && !is_json {
            return Ok((request, None));
        }

        let (parts, body) = request.into_parts();
        let bytes = match axum::body::to_bytes(body, self.max_body_size).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to buffer request body");
                return Err((StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response());
            }
        };

        let token = if is_form {
            self.token_from_form(&bytes)
        } else {
            self.token_from_json(&bytes)
        };

        Ok((Request::from_parts(parts, Body::from(bytes)), token))
    }

    fn token_from_form(&self, bytes: &Bytes) -> Option<String> {
        url::form_urlencoded::parse(bytes)
            .find(|(key, _)| key == self.config.form_field.as_str())
            .map(|(_, value)| value.into_owned())
    }

    fn token_from_json(&self, bytes: &Bytes) -> Option<String> {
        serde_json::from_slice::<serde_json::Value>(bytes)
            .ok()?
            .get(&self.config.form_field)?
            .as_str()
            .map(str::to_owned)
    }
}

/// Per-request access to the CSRF secret, attached by [`csrf_middleware`].
#[derive(Clone)]
pub struct CsrfGuard {
    secret: String,
    removal_cookie: String,
}

impl CsrfGuard {
    /// Mint a fresh token for this request's secret.
    pub fn token(&self) -> String {
        mint_token(&self.secret)
    }

    /// `Set-Cookie` header value that invalidates the secret.
    pub fn clear_cookie(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.removal_cookie).ok()
    }
}

impl std::fmt::Debug for CsrfGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfGuard").field("secret", &"***").finish()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CsrfGuard {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CsrfGuard>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
        ))
    }
}

/// CSRF middleware.
pub async fn csrf_middleware(
    State(csrf): State<Arc<CsrfProtection>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let existing = csrf.read_secret(request.headers());
    let needs_check =
        !is_safe_method(request.method()) && !csrf.is_exempt(request.uri().path());

    let mut request = if needs_check {
        let path = request.uri().path().to_string();
        let (request, token) = match csrf.extract_token(request).await {
            Ok(found) => found,
            Err(response) => return response,
        };

        let valid = match (existing.as_deref(), token.as_deref()) {
            (Some(secret), Some(token)) => verify_token(secret, token),
            _ => false,
        };

        if !valid {
            tracing::warn!(
                path = %path,
                has_cookie = existing.is_some(),
                has_token = token.is_some(),
                "CSRF validation failed"
            );
            metrics::record_rejection("csrf");
            return (StatusCode::FORBIDDEN, "Invalid CSRF token").into_response();
        }
        request
    } else {
        request
    };

    let (secret, is_new) = match existing {
        Some(secret) => (secret, false),
        None => (csrf.generate_secret(), true),
    };

    request.extensions_mut().insert(CsrfGuard {
        secret: secret.clone(),
        removal_cookie: csrf.removal_cookie(),
    });

    let mut response = next.run(request).await;

    if is_new {
        match HeaderValue::from_str(&csrf.secret_cookie(&secret)) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode CSRF cookie"),
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    fn protection() -> Arc<CsrfProtection> {
        Arc::new(CsrfProtection::new(CsrfConfig::default(), 1024))
    }

    fn app(csrf: Arc<CsrfProtection>) -> Router {
        Router::new()
            .route(
                "/",
                get(|guard: CsrfGuard| async move { guard.token() })
                    .post(|body: String| async move { body }),
            )
            .route("/csrf-token", post(|| async { "exempt" }))
            .layer(axum::middleware::from_fn_with_state(csrf, csrf_middleware))
    }

    #[test]
    fn minted_tokens_verify() {
        let secret = "c2VjcmV0LXNlY3JldC1zZWNyZXQ";
        let first = mint_token(secret);
        let second = mint_token(secret);
        assert_ne!(first, second);
        assert!(verify_token(secret, &first));
        assert!(verify_token(secret, &second));
    }

    #[test]
    fn tokens_do_not_cross_secrets() {
        let token = mint_token("secret-one");
        assert!(!verify_token("secret-two", &token));
        assert!(!verify_token("secret-one", "garbage"));
        assert!(!verify_token("secret-one", "-abc"));
        assert!(!verify_token("secret-one", ""));
    }

    #[test]
    fn removal_cookie_expires() {
        let cookie = protection().removal_cookie();
        assert!(cookie.starts_with("_csrf=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn secret_cookie_attributes() {
        let cookie = protection().secret_cookie("abc");
        assert!(cookie.starts_with("_csrf=abc"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Path=/"));
    }

    #[tokio::test]
    async fn get_sets_cookie_once() {
        let response = app(protection())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_some());

        let response = app(protection())
            .oneshot(
                Request::get("/")
                    .header(header::COOKIE, "_csrf=existing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn post_without_token_is_forbidden() {
        let response = app(protection())
            .oneshot(
                Request::post("/")
                    .header(header::COOKIE, "_csrf=secret")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("name=Bob"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn post_without_cookie_is_forbidden() {
        let token = mint_token("secret");
        let response = app(protection())
            .oneshot(
                Request::post("/")
                    .header("x-csrf-token", token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn form_token_passes_and_body_is_restored() {
        let token = mint_token("secret");
        let body = format!("name=Bob&_csrf={}", token);
        let response = app(protection())
            .oneshot(
                Request::post("/")
                    .header(header::COOKIE, "_csrf=secret")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(body.clone()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let echoed = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(echoed, body.as_bytes());
    }

    #[tokio::test]
    async fn json_token_passes() {
        let token = mint_token("secret");
        let body = serde_json::json!({ "_csrf": token, "name": "Bob" }).to_string();
        let response = app(protection())
            .oneshot(
                Request::post("/")
                    .header(header::COOKIE, "theme=dark; _csrf=secret")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn exempt_path_skips_check() {
        let response = app(protection())
            .oneshot(Request::post("/csrf-token").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
