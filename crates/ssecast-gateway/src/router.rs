//! Axum router wiring.
//!
//! - `{gateway.events_path}` (default `/events`): event stream
//! - `/healthz`: liveness
//! - anything else: the static page

use axum::{routing::get, Router};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    let events_path = state.cfg().gateway.events_path.clone();
    Router::new()
        .route(&events_path, get(transport::sse::events))
        .route("/healthz", get(ops::healthz))
        .fallback(ops::static_page)
        .with_state(state)
}
