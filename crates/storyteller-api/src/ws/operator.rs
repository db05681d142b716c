//! The operator WebSocket channel.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{Sink, SinkExt, StreamExt};
use storyteller_broadcast::frames::OperatorFrame;
use storyteller_playback::commands::SessionCommand;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use crate::state::AppState;
use crate::ws::OperatorReply;

/// GET /ws/operator
pub async fn operator_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_operator(socket, state))
}

async fn handle_operator(socket: WebSocket, state: AppState) {
    info!("operator connected");
    let (mut sink, mut stream) = socket.split();

    // Join first, then snapshot the state, so nothing is missed between
    // the two.
    let mut updates = state.controller.router().join_operator().await;
    let status = state.controller.status().await;
    if send_json(&mut sink, &OperatorFrame::State { state: status })
        .await
        .is_err()
    {
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
                Err(RecvError::Lagged(missed)) => {
                    // Fell behind the feed; resynchronize from scratch.
                    debug!(missed, "operator channel lagged; resyncing");
                    let status = state.controller.status().await;
                    if send_json(&mut sink, &OperatorFrame::State { state: status })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let reply = match serde_json::from_str::<SessionCommand>(text.as_str()) {
                        Ok(command) => match state.controller.apply(command).await {
                            Ok(result) => OperatorReply::Ack { result },
                            Err(e) => OperatorReply::CommandError {
                                message: e.to_string(),
                            },
                        },
                        Err(e) => OperatorReply::CommandError {
                            message: format!("malformed command: {e}"),
                        },
                    };
                    if send_json(&mut sink, &reply).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(error = %e, "operator socket error");
                    break;
                }
            },
        }
    }
    info!("operator disconnected");
}

async fn send_json<T: serde::Serialize>(
    sink: &mut (impl Sink<Message, Error = axum::Error> + Unpin),
    value: &T,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(value).map_err(axum::Error::new)?;
    sink.send(Message::Text(text.into())).await
}
