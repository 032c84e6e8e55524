//! Contact submissions: the only persisted entity.
//!
//! A [`NewContact`] is built from already-sanitized fields and carries the
//! schema rules of the collection (every content field required and
//! non-empty). A [`ContactRecord`] is what the store hands back once a write
//! has been acknowledged.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whitespace as browsers' `\s` defines it: ASCII blanks, no-break and
/// typographic spaces, line/paragraph separators and the BOM. U+0085 is not
/// included.
const FORM_WHITESPACE: &str =
    r"\t\n\x0B\x0C\r \x{A0}\x{1680}\x{2000}-\x{200A}\x{2028}\x{2029}\x{202F}\x{205F}\x{3000}\x{FEFF}";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"^[^{ws}@]+@[^{ws}@]+\.[^{ws}@]+$",
        ws = FORM_WHITESPACE
    );
    Regex::new(&pattern).expect("email pattern compiles")
});

/// Shape check for `local@domain.tld`. Any form whitespace or a second `@`
/// fails.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Rejected by the collection schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("contact validation failed: `{0}` is required")]
    MissingField(&'static str),
}

/// A submission ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl NewContact {
    /// Build a submission, enforcing the required-field rules.
    pub fn try_new(
        name: String,
        email: String,
        subject: String,
        message: String,
    ) -> Result<Self, SchemaError> {
        let contact = Self {
            name,
            email,
            subject,
            message,
        };
        contact.validate()?;
        Ok(contact)
    }

    /// Check every required field is present.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let fields = [
            ("name", &self.name),
            ("email", &self.email),
            ("subject", &self.subject),
            ("message", &self.message),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(SchemaError::MissingField(field));
            }
        }
        Ok(())
    }
}

/// A persisted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContactRecord {
    /// Stamp a new record; both timestamps start equal.
    pub fn from_new(id: String, contact: NewContact, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: contact.name,
            email: contact.email,
            subject: contact.subject,
            message: contact.message,
            created_at: now,
            updated_at: now,
        }
    }
}
