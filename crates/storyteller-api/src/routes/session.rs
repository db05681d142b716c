//! Session status route.
//!
//! Live updates flow over the operator WebSocket; this endpoint exists so
//! the operator UI can render the current state on first load.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use storyteller_broadcast::frames::OperatorStateView;
use tracing::instrument;

use crate::state::AppState;

/// GET /
#[instrument(skip(state))]
async fn session_status(State(state): State<AppState>) -> Json<OperatorStateView> {
    Json(state.controller.status().await)
}

/// Returns the router for the session context.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(session_status))
}
