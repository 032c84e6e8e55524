//! Contact form submission.
//!
//! # Flow
//! ```text
//! ContactForm (urlencoded or JSON)
//!     → email shape check      (fail: 400, nothing else happens)
//!     → sanitize all fields
//!     → NewContact::try_new    (required-field rules)
//!     → ContactStore::insert   (exactly one attempt)
//!     → saved: clear CSRF cookie, success page
//!       not acknowledged / error: failure page
//! ```

use axum::{
    extract::{FromRequest, Request, State},
    http::header,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;

use crate::http::error::AppError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::{sanitize_text, CsrfGuard};
use crate::storage::{ContactStore, StoreError};
use crate::submission::{is_valid_email, ContactRecord, NewContact};

/// Submitted fields. Absent fields stay `None`; the token field is ignored
/// here because the CSRF middleware has already consumed it.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ContactForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

impl<S: Send + Sync> FromRequest<S> for ContactForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            Form::<ContactForm>::from_request(req, state)
                .await
                .map(|Form(form)| form)
                .map_err(|e| AppError::BadRequest(e.body_text()))
        } else if content_type.starts_with("application/json") {
            Json::<ContactForm>::from_request(req, state)
                .await
                .map(|Json(form)| form)
                .map_err(|e| AppError::BadRequest(e.body_text()))
        } else {
            Ok(ContactForm::default())
        }
    }
}

/// Sanitize, build, and write one submission.
async fn persist(
    store: &dyn ContactStore,
    form: ContactForm,
) -> Result<Option<ContactRecord>, StoreError> {
    let clean = |value: Option<String>| sanitize_text(value.as_deref().unwrap_or_default());

    let contact = NewContact::try_new(
        clean(form.name),
        clean(form.email),
        clean(form.subject),
        clean(form.message),
    )?;

    store.insert(contact).await
}

/// `POST /`: validate, sanitize, persist, respond with a static page.
pub async fn submit(
    State(state): State<AppState>,
    csrf: CsrfGuard,
    form: ContactForm,
) -> Result<Response, AppError> {
    // An absent email is checked as the text "undefined", which never matches.
    let email = form.email.as_deref().unwrap_or("undefined");
    if !is_valid_email(email) {
        tracing::info!("Rejected submission with invalid email");
        metrics::record_submission("invalid_email");
        return Err(AppError::BadRequest("Invalid email address.".to_string()));
    }

    match persist(state.store.as_ref(), form).await {
        Ok(Some(record)) => {
            tracing::info!(
                id = %record.id,
                subject = %record.subject,
                created_at = %record.created_at,
                "New contact message saved"
            );
            metrics::record_submission("saved");

            let mut response = state.pages.success().await?.into_response();
            if let Some(clear) = csrf.clear_cookie() {
                response.headers_mut().append(header::SET_COOKIE, clear);
            }
            Ok(response)
        }
        Ok(None) => {
            tracing::warn!("No contact saved");
            metrics::record_submission("not_saved");
            Ok(state.pages.failure().await?.into_response())
        }
        Err(e) => {
            tracing::error!(error = %e, "Error saving contact");
            metrics::record_submission("failed");
            Ok(state.pages.failure().await?.into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn form(name: &str, email: &str) -> ContactForm {
        ContactForm {
            name: Some(name.into()),
            email: Some(email.into()),
            subject: Some("Hello".into()),
            message: Some("Nice <b>site</b>".into()),
        }
    }

    #[tokio::test]
    async fn persist_sanitizes_every_field() {
        let store = MemoryStore::new();
        let record = persist(&store, form("<script>x</script>Bob", "bob@example.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.name, "Bob");
        assert_eq!(record.message, "Nice site");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn persist_rejects_fields_emptied_by_sanitizer() {
        let store = MemoryStore::new();
        let err = persist(&store, form("<script>x</script>", "bob@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Schema(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn persist_rejects_missing_fields() {
        let store = MemoryStore::new();
        let partial = ContactForm {
            email: Some("bob@example.com".into()),
            ..ContactForm::default()
        };
        assert!(persist(&store, partial).await.is_err());
        assert!(store.is_empty());
    }
}
