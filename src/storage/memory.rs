//! In-process contact store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::storage::{ContactStore, StoreError};
use crate::submission::{ContactRecord, NewContact};

/// Keeps records in a vector. Cloning shares the same records.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Vec<ContactRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record, oldest first.
    pub fn records(&self) -> Vec<ContactRecord> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn insert(&self, contact: NewContact) -> Result<Option<ContactRecord>, StoreError> {
        contact.validate()?;

        let record = ContactRecord::from_new(Uuid::new_v4().to_string(), contact, Utc::now());
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store mutex poisoned".into()))?
            .push(record.clone());
        Ok(Some(record))
    }

    async fn disconnect(&self) {
        tracing::debug!(records = self.len(), "Memory store closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::SchemaError;

    fn contact(name: &str) -> NewContact {
        NewContact {
            name: name.into(),
            email: "bob@example.com".into(),
            subject: "Hi".into(),
            message: "hello".into(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_id_and_keeps_record() {
        let store = MemoryStore::new();
        let record = store.insert(contact("Bob")).await.unwrap().unwrap();
        assert!(!record.id.is_empty());
        assert_eq!(store.records(), vec![record]);
    }

    #[tokio::test]
    async fn clones_share_records() {
        let store = MemoryStore::new();
        let handle = store.clone();
        store.insert(contact("Bob")).await.unwrap();
        store.insert(contact("Ann")).await.unwrap();
        assert_eq!(handle.len(), 2);
    }

    #[tokio::test]
    async fn schema_violation_writes_nothing() {
        let store = MemoryStore::new();
        let err = store.insert(contact("")).await.unwrap_err();
        assert!(matches!(err, StoreError::Schema(SchemaError::MissingField("name"))));
        assert!(store.is_empty());
    }
}
