//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware chain)
//!     → request.rs (request ID, trace span)
//!     → pages.rs   GET /, GET /csrf-token
//!     → contact.rs POST /
//!     → response.rs (static pages, token embedding)
//!     → Send to client
//! ```

pub mod contact;
pub mod error;
pub mod pages;
pub mod request;
pub mod response;
pub mod server;

pub use error::AppError;
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
