//! Change-event receiver.
//!
//! The body is handed to the notifier undecoded so that a malformed
//! envelope still produces an invocation result instead of an extractor
//! rejection.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tracing::info;

use repo_event_notifier_core::InvocationResult;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/events", post(receive_event))
}

async fn receive_event(State(state): State<Arc<AppState>>, body: Bytes) -> Json<InvocationResult> {
    info!(bytes = body.len(), "received change event");
    Json(state.notifier.handle_payload(&body).await)
}
