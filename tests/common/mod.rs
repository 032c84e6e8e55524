//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;

use portfolio_server::config::{AppConfig, SameSitePolicy, StoreKind};
use portfolio_server::storage::{ContactStore, StoreError};
use portfolio_server::submission::{ContactRecord, NewContact};
use portfolio_server::{AppContext, HttpServer, Shutdown};

pub const TEST_ORIGIN: &str = "http://localhost:5173";

/// Defaults with the in-process store, the repository's site pages and a
/// cookie that works over plain HTTP.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.database.kind = StoreKind::Memory;
    config.site.root = concat!(env!("CARGO_MANIFEST_DIR"), "/site").to_string();
    config.cors.allowed_origins.push(TEST_ORIGIN.to_string());
    config.csrf.cookie_secure = false;
    config.csrf.cookie_same_site = SameSitePolicy::Lax;
    config
}

/// A running server on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Load the index page and return the cookie/token pair it issued.
    pub async fn session(&self) -> Session {
        let response = self.client.get(self.url("/")).send().await.unwrap();
        assert_eq!(response.status(), 200);
        let cookie = csrf_cookie(&response).expect("index page sets the CSRF cookie");
        let body = response.text().await.unwrap();
        let token = embedded_token(&body).expect("index page embeds a token");
        Session { cookie, token }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// A `_csrf` cookie pair and a token minted from it.
pub struct Session {
    /// `name=value`, ready for a `Cookie` header.
    pub cookie: String,
    pub token: String,
}

pub async fn spawn_server(config: AppConfig, store: Arc<dyn ContactStore>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let context = AppContext::new(config, store);
    let server = HttpServer::new(&context);
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    TestServer {
        addr,
        client: reqwest::Client::new(),
        shutdown,
    }
}

/// The `name=value` part of the `_csrf` Set-Cookie header, if any.
pub fn csrf_cookie(response: &reqwest::Response) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with("_csrf="))
        .and_then(|c| c.split(';').next().map(str::to_owned))
}

pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_owned)
        .collect()
}

/// Pull the token out of the hidden `_csrf` field.
pub fn embedded_token(html: &str) -> Option<String> {
    let field = html.find(r#"id="_csrf" value=""#)?;
    let rest = &html[field + r#"id="_csrf" value=""#.len()..];
    rest.find('"').map(|end| rest[..end].to_string())
}

pub fn valid_fields<'a>(token: &'a str) -> Vec<(&'static str, &'a str)> {
    vec![
        ("_csrf", token),
        ("name", "Ada Lovelace"),
        ("email", "ada@example.com"),
        ("subject", "Engines"),
        ("message", "Loved the analytical engine write-up."),
    ]
}

/// Store that always errors.
pub struct FailingStore;

#[async_trait]
impl ContactStore for FailingStore {
    async fn insert(&self, _contact: NewContact) -> Result<Option<ContactRecord>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn disconnect(&self) {}
}

/// Store that stalls before erroring, like a driver waiting out server
/// selection.
pub struct SlowFailingStore(pub Duration);

#[async_trait]
impl ContactStore for SlowFailingStore {
    async fn insert(&self, _contact: NewContact) -> Result<Option<ContactRecord>, StoreError> {
        tokio::time::sleep(self.0).await;
        Err(StoreError::Unavailable("server selection timed out".into()))
    }

    async fn disconnect(&self) {}
}

/// Store whose writes are never acknowledged.
pub struct UnacknowledgedStore;

#[async_trait]
impl ContactStore for UnacknowledgedStore {
    async fn insert(&self, _contact: NewContact) -> Result<Option<ContactRecord>, StoreError> {
        Ok(None)
    }

    async fn disconnect(&self) {}
}
