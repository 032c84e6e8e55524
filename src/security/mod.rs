//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (refuse unlisted Origin, answer preflight)
//!     → csrf.rs (verify token against cookie secret)
//!     → rate_limit.rs (per-client fixed window)
//!     → submission handler (sanitize.rs on every field)
//!
//! Outgoing response:
//!     ← headers.rs (CSP, HSTS, hardening headers on everything)
//! ```
//!
//! # Design Decisions
//! - Fail closed: any check failure short-circuits with an error response
//! - No trust in client input; stored text is always sanitized

pub mod cors;
pub mod csrf;
pub mod headers;
pub mod rate_limit;
pub mod sanitize;

pub use cors::{origin_guard_middleware, OriginPolicy};
pub use csrf::{csrf_middleware, CsrfGuard, CsrfProtection};
pub use rate_limit::{rate_limit_middleware, RateLimiterState};
pub use sanitize::sanitize_text;
