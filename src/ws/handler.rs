//! Axum WebSocket upgrade handler for client connections.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::{ConnectionContext, run_connection};

/// Upgrades any request on the client listener to a WebSocket.
///
/// The upgrade callback runs exactly once per accepted socket; it performs
/// registration before any frame is processed.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(ctx): State<ConnectionContext>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_connection(socket, ctx))
}
