//! Persistence subsystem.
//!
//! # Data Flow
//! ```text
//! submit handler
//!     → ContactStore::insert(NewContact)
//!         → mongo.rs  (MongoDB collection, schema validator on the server)
//!         → memory.rs (in-process, tests and database-less runs)
//!     → Some(ContactRecord) | None (write not acknowledged) | StoreError
//! ```
//!
//! # Design Decisions
//! - One write attempt per call; no retries, no idempotency keys
//! - The store owns records; the process keeps nothing past the request

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use thiserror::Error;

use crate::submission::{ContactRecord, NewContact, SchemaError};

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Errors raised by a store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A document collection of contact submissions.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Write one submission.
    ///
    /// Returns `Ok(None)` when the backend answered without acknowledging a
    /// document.
    async fn insert(&self, contact: NewContact) -> Result<Option<ContactRecord>, StoreError>;

    /// Release connections. Called once during shutdown.
    async fn disconnect(&self);
}
