//! Event stream for dashboards.
//!
//! `GET /events` upgrades to a WebSocket and forwards every
//! [`GatewayEvent`] as one JSON text frame. Frames from the subscriber
//! are ignored apart from close.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use crate::app_state::AppState;
use crate::domain::GatewayEvent;

/// `GET /events` — Upgrade to a WebSocket event stream.
pub async fn events_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let event_rx = state.event_bus.subscribe();
    ws.on_upgrade(move |socket| stream_events(socket, event_rx))
}

async fn stream_events(socket: WebSocket, mut event_rx: broadcast::Receiver<GatewayEvent>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(event) => {
                        let json = match serde_json::to_string(&event) {
                            Ok(json) => json,
                            Err(err) => {
                                tracing::warn!(%err, "failed to serialize event");
                                continue;
                            }
                        };
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "event subscriber lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("event stream closed");
}

/// Event stream route, mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new().route("/events", get(events_handler))
}
