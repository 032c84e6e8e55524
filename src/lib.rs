//! Portfolio site server: static pages plus a hardened contact endpoint.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod storage;
pub mod submission;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::{AppContext, Shutdown};
