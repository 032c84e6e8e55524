//! MongoDB-backed contact store.
//!
//! # Responsibilities
//! - Connect and verify the deployment answers a ping
//! - Ensure the collection exists with a `$jsonSchema` validator
//! - Insert one document per submission
//!
//! # Document Shape
//! `{ _id, name, email, subject, message, createdAt, updatedAt, __v }`

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId, Bson, DateTime as BsonDateTime, Document};
use mongodb::error::ErrorKind;
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};

use crate::config::DatabaseConfig;
use crate::storage::{ContactStore, StoreError};
use crate::submission::{ContactRecord, NewContact};

/// Server error code for `NamespaceExists`.
const NAMESPACE_EXISTS: i32 = 48;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    email: String,
    subject: String,
    message: String,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
    #[serde(rename = "__v")]
    version: i32,
}

/// Contact store writing to a MongoDB collection.
pub struct MongoStore {
    client: Client,
    collection: Collection<ContactDocument>,
}

impl MongoStore {
    /// Connect, ping, and prepare the collection.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(&config.uri).await?;
        let database = client.database(&config.database);

        database.run_command(doc! { "ping": 1 }).await?;

        match database
            .create_collection(&config.collection)
            .validator(contact_schema())
            .await
        {
            Ok(()) => {
                tracing::info!(collection = %config.collection, "Created contact collection");
            }
            Err(e) if is_namespace_exists(&e) => {
                tracing::debug!(collection = %config.collection, "Contact collection already exists");
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(database = %config.database, "Database connected");

        Ok(Self {
            collection: database.collection(&config.collection),
            client,
        })
    }
}

#[async_trait]
impl ContactStore for MongoStore {
    async fn insert(&self, contact: NewContact) -> Result<Option<ContactRecord>, StoreError> {
        contact.validate()?;

        let now = Utc::now();
        let stamp = BsonDateTime::from_millis(now.timestamp_millis());
        let document = ContactDocument {
            id: ObjectId::new(),
            name: contact.name.clone(),
            email: contact.email.clone(),
            subject: contact.subject.clone(),
            message: contact.message.clone(),
            created_at: stamp,
            updated_at: stamp,
            version: 0,
        };

        let result = self.collection.insert_one(&document).await?;

        match result.inserted_id {
            Bson::ObjectId(id) => Ok(Some(ContactRecord::from_new(id.to_hex(), contact, now))),
            _ => Ok(None),
        }
    }

    async fn disconnect(&self) {
        self.client.clone().shutdown().await;
        tracing::info!("Database disconnected");
    }
}

fn is_namespace_exists(err: &mongodb::error::Error) -> bool {
    matches!(err.kind.as_ref(), ErrorKind::Command(cmd) if cmd.code == NAMESPACE_EXISTS)
}

/// Server-side schema applied on every write.
fn contact_schema() -> Document {
    let text = doc! { "bsonType": "string", "minLength": 1 };
    doc! {
        "$jsonSchema": {
            "bsonType": "object",
            "required": ["name", "email", "subject", "message", "createdAt", "updatedAt"],
            "properties": {
                "name": text.clone(),
                "email": text.clone(),
                "subject": text.clone(),
                "message": text,
                "createdAt": { "bsonType": "date" },
                "updatedAt": { "bsonType": "date" },
            }
        }
    }
}
