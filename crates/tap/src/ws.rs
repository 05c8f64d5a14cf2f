//! WebSocket live feed
//!
//! `GET /v1/live` upgrades to a WebSocket and streams one text frame per
//! broadcast event. Client frames other than ping and close are ignored.

use std::sync::Arc;

use axum::Json;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::subscriber::Frame;
use crate::tap_point::TapPoint;

/// Register a subscriber and upgrade the connection
///
/// The subscriber is registered before the handshake completes so no event
/// accepted after this call is missed. When the subscriber limit is reached
/// the upgrade is refused with 503.
pub fn upgrade(ws: WebSocketUpgrade, tap: Arc<TapPoint>) -> Response {
    let (id, frames) = match tap.subscribe() {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!(error = %e, "refusing live subscriber");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    ws.on_upgrade(move |socket| stream_events(socket, tap, id, frames))
}

async fn stream_events(
    socket: WebSocket,
    tap: Arc<TapPoint>,
    id: u64,
    mut frames: mpsc::Receiver<Frame>,
) {
    let (mut sender, mut receiver) = socket.split();
    debug!(id, "live feed connected");

    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(frame) = frame else { break };
                if sender.send(Message::Text(frame.as_ref().into())).await.is_err() {
                    break; // Client disconnected
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(id, error = %e, "live feed read error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // The maintenance task may already have removed it
    if tap.unsubscribe(id).is_err() {
        debug!(id, "live subscriber already removed");
    }
    debug!(id, "live feed closed");
}
