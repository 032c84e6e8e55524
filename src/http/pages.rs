//! Page and token serving.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::http::server::AppState;
use crate::security::CsrfGuard;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenBody {
    pub csrf_token: String,
}

/// `GET /`: the index page with a fresh token in its hidden field.
pub async fn index(State(state): State<AppState>, csrf: CsrfGuard) -> Response {
    let token = csrf.token();
    match state.pages.index(&token).await {
        Ok(page) => page.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Error reading index page");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// `GET /csrf-token`: a fresh token for asynchronous refresh.
pub async fn csrf_token(csrf: CsrfGuard) -> Json<CsrfTokenBody> {
    let token = csrf.token();
    tracing::debug!("Issued CSRF token");
    Json(CsrfTokenBody { csrf_token: token })
}
