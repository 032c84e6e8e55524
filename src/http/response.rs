//! Static page loading.
//!
//! Pages are read from disk on every request so edits to the site directory
//! show up without a restart. The only transformation is writing the CSRF
//! token into the hidden form field of the index page.

use std::path::{Path, PathBuf};

use axum::response::Html;

use crate::config::SiteConfig;
use crate::http::error::AppError;

/// Hidden field in the index page that receives the token.
pub const CSRF_PLACEHOLDER: &str = r#"<input type="hidden" name="_csrf" id="_csrf">"#;

/// Write `token` into the placeholder field of `html`.
pub fn embed_csrf_token(html: &str, token: &str) -> String {
    html.replace(
        CSRF_PLACEHOLDER,
        &format!(r#"<input type="hidden" name="_csrf" id="_csrf" value="{}">"#, token),
    )
}

/// The site's page files.
#[derive(Debug, Clone)]
pub struct Pages {
    index: PathBuf,
    success: PathBuf,
    failure: PathBuf,
}

impl Pages {
    pub fn new(config: &SiteConfig) -> Self {
        let root = Path::new(&config.root);
        Self {
            index: root.join(&config.index_page),
            success: root.join(&config.success_page),
            failure: root.join(&config.failure_page),
        }
    }

    async fn read(path: &Path) -> Result<String, AppError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| AppError::Page {
                path: path.display().to_string(),
                source,
            })
    }

    /// Index page with `token` embedded.
    pub async fn index(&self, token: &str) -> Result<Html<String>, AppError> {
        let html = Self::read(&self.index).await?;
        if !html.contains(CSRF_PLACEHOLDER) {
            tracing::warn!(path = %self.index.display(), "Index page has no CSRF field");
        }
        Ok(Html(embed_csrf_token(&html, token)))
    }

    pub async fn success(&self) -> Result<Html<String>, AppError> {
        Self::read(&self.success).await.map(Html)
    }

    pub async fn failure(&self) -> Result<Html<String>, AppError> {
        Self::read(&self.failure).await.map(Html)
    }
}
