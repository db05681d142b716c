//! Viewer WebSocket channels.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::{Sink, SinkExt, StreamExt};
use storyteller_broadcast::router::RoomKey;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use crate::state::AppState;

/// GET /ws/viewer: the all-access room.
pub async fn viewer_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_viewer(socket, state, RoomKey::AllAccess))
}

/// GET /ws/viewer/{token}: a category room, addressed by join link.
///
/// The token is resolved before the upgrade; an unknown token is a plain
/// 404 rather than a connection that dies immediately.
pub async fn viewer_category_ws(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(category) = state.store.resolve_link(&token).await else {
        return StatusCode::NOT_FOUND.into_response();
    };
    ws.on_upgrade(move |socket| handle_viewer(socket, state, RoomKey::Category(category)))
        .into_response()
}

async fn handle_viewer(socket: WebSocket, state: AppState, room: RoomKey) {
    info!(?room, "viewer joined");
    let (mut sink, mut stream) = socket.split();

    // Catch-up first: the room's projection, or an explicit no-content
    // signal. This may legitimately lag the operator's true position.
    let (catch_up, mut updates) = state.controller.router().join(room.clone()).await;
    if send_json(&mut sink, &catch_up).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(frame) => {
                    if send_json(&mut sink, &frame).await.is_err() {
                        break;
                    }
                }
                // A lagged viewer only ever needs the newest frame; the
                // next delivery supersedes everything it missed.
                Err(RecvError::Lagged(missed)) => {
                    debug!(?room, missed, "viewer channel lagged");
                }
                Err(RecvError::Closed) => break,
            },
            inbound = stream.next() => match inbound {
                // Viewer channels are push-only; inbound text is ignored.
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(?room, error = %e, "viewer socket error");
                    break;
                }
            },
        }
    }
    info!(?room, "viewer left");
}

async fn send_json<T: serde::Serialize>(
    sink: &mut (impl Sink<Message, Error = axum::Error> + Unpin),
    value: &T,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(value).map_err(axum::Error::new)?;
    sink.send(Message::Text(text.into())).await
}
