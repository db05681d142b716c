//! WebSocket channels.
//!
//! The operator channel carries commands in and runtime state plus ticks
//! out; viewer channels are push-only and deliver each room's filtered
//! view of the session.

pub mod operator;
pub mod viewer;

use axum::{Router, routing::get};
use serde::Serialize;
use storyteller_playback::controller::CommandAck;

use crate::state::AppState;

/// Reply sent to the operator for each received command frame.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum OperatorReply {
    /// The command was handled.
    Ack {
        /// What the command did.
        result: CommandAck,
    },
    /// The command failed; the session is unchanged.
    CommandError {
        /// Human-readable reason.
        message: String,
    },
}

/// Returns the router for the WebSocket endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws/operator", get(operator::operator_ws))
        .route("/ws/viewer", get(viewer::viewer_ws))
        .route("/ws/viewer/{token}", get(viewer::viewer_category_ws))
}
