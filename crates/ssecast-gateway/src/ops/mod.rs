//! Operational and static HTTP endpoints.
//!
//! - `/healthz` : liveness plus the current client count
//! - fallback   : the configured static page

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app_state::AppState;

pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "clients": state.broker().client_count(),
    }))
}

pub async fn static_page(State(state): State<AppState>) -> Response {
    let path = &state.cfg().gateway.static_file;
    match tokio::fs::read(path).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::debug!(%path, error = %e, "static page unavailable");
            (StatusCode::NOT_FOUND, "not found").into_response()
        }
    }
}
