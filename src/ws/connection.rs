//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single client connection: registers
//! it, feeds inbound text frames to the [`Dispatcher`], drains the
//! connection's outbound queue into the socket, and unregisters it when
//! either side closes.

use std::fmt;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, StreamExt};

use super::dispatcher::Dispatcher;
use crate::domain::client_entry::DEFAULT_DISPLAY_NAME;
use crate::domain::{ClientHandle, ClientId, ClientRegistry, EventBus, Outbound, OutboundQueue};

/// Everything a connection task needs, cloned once per accepted socket.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    /// Registry the connection joins.
    pub registry: Arc<ClientRegistry>,
    /// Shared inbound router.
    pub dispatcher: Dispatcher,
    /// Bus for transport events and write failures.
    pub event_bus: EventBus,
    /// Capacity of the per-connection outbound queue.
    pub outbound_capacity: usize,
}

impl ConnectionContext {
    /// Creates a new context with a dispatcher over `registry`.
    #[must_use]
    pub fn new(
        registry: Arc<ClientRegistry>,
        event_bus: EventBus,
        outbound_capacity: usize,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(Arc::clone(&registry), event_bus.clone()),
            registry,
            event_bus,
            outbound_capacity,
        }
    }
}

/// Runs one client connection to completion.
///
/// The connection is registered before the first frame is read and
/// removed once the read side ends or the writer stops.
pub async fn run_connection(socket: WebSocket, ctx: ConnectionContext) {
    let (ws_tx, mut ws_rx) = socket.split();
    let (handle, queue) = ClientHandle::channel(ctx.outbound_capacity);
    let client_id = handle.id();

    let mut writer = tokio::spawn(write_loop(ws_tx, queue, client_id, ctx.clone()));
    ctx.registry.add(handle).await;

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        ctx.dispatcher.handle_text(client_id, text.as_str()).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::debug!(%client_id, %err, "ws read failed");
                        break;
                    }
                }
            }
            _ = &mut writer => {
                tracing::debug!(%client_id, "ws writer stopped");
                break;
            }
        }
    }

    ctx.registry.remove(client_id).await;
    writer.abort();
    tracing::debug!(%client_id, "ws connection closed");
}

/// Drains the outbound queue into `sink` until a close is requested or a
/// write fails.
///
/// A failed text write is reported as a send failure naming the client;
/// the writer then stops, which ends the connection.
async fn write_loop<S>(
    mut sink: S,
    mut queue: OutboundQueue,
    client_id: ClientId,
    ctx: ConnectionContext,
) where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    while let Some(frame) = queue.recv().await {
        match frame {
            Outbound::Text(payload) => {
                if let Err(err) = sink.send(Message::text(payload.to_string())).await {
                    let name = ctx
                        .registry
                        .display_name(client_id)
                        .await
                        .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());
                    ctx.event_bus.send_failed(client_id, &name, "frame", &err);
                    break;
                }
            }
            Outbound::Close => {
                if let Err(err) = sink.send(Message::Close(None)).await {
                    tracing::debug!(%client_id, %err, "close frame not delivered");
                }
                break;
            }
        }
    }
}
