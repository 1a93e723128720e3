//! Broadcast channel for core events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. The registry,
//! dispatcher, transport and execute service publish [`GatewayEvent`]s
//! through it; presentation consumers subscribe and apply them in order.

use std::fmt;

use chrono::Utc;
use tokio::sync::broadcast;

use super::gateway_event::SERVER_SOURCE;
use super::{ClientId, GatewayEvent, Severity};

/// Broadcast bus for [`GatewayEvent`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity.
/// When the ring buffer is full, the oldest events are dropped for
/// lagging receivers. Publishing never blocks and never fails.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GatewayEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    /// If there are no active receivers, the event is silently dropped.
    pub fn publish(&self, event: GatewayEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new receiver that will receive all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.sender.subscribe()
    }

    /// Reports a frame that could not be handed to a client.
    ///
    /// Logs at `error` and publishes an error [`GatewayEvent::LogLine`]
    /// attributed to the server that names the client.
    pub fn send_failed(
        &self,
        client_id: ClientId,
        display_name: &str,
        what: &str,
        reason: &dyn fmt::Display,
    ) {
        tracing::error!(%client_id, name = %display_name, %reason, "failed to send {what}");
        self.publish(GatewayEvent::LogLine {
            client_id: Some(client_id),
            source: SERVER_SOURCE.to_string(),
            severity: Severity::Error,
            message: format!("failed to send {what} to {display_name}: {reason}"),
            timestamp: Utc::now(),
        });
    }
}
