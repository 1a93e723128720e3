//! Routes inbound client frames to their handlers.
//!
//! Nothing in here fails outward: malformed frames become a single warning
//! event, missing payload fields are skipped, and unknown operations are
//! logged as information.

use std::sync::Arc;

use chrono::Utc;

use super::messages::{InboundMessage, Op};
use crate::domain::client_entry::DEFAULT_DISPLAY_NAME;
use crate::domain::{ClientId, ClientRegistry, EventBus, GatewayEvent, Severity};

/// Protocol dispatcher shared by all connections.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ClientRegistry>,
    event_bus: EventBus,
}

impl Dispatcher {
    /// Creates a dispatcher over an injected registry.
    #[must_use]
    pub fn new(registry: Arc<ClientRegistry>, event_bus: EventBus) -> Self {
        Self {
            registry,
            event_bus,
        }
    }

    /// Handles one text frame received from `client_id`.
    pub async fn handle_text(&self, client_id: ClientId, text: &str) {
        let msg = match InboundMessage::parse(text) {
            Ok(msg) => msg,
            Err(err) => {
                tracing::warn!(%client_id, %err, "dropping malformed frame");
                let source = self.source_name(client_id).await;
                self.event_bus.publish(GatewayEvent::client_log(
                    client_id,
                    source,
                    Severity::Warn,
                    err.to_string(),
                ));
                return;
            }
        };

        match msg.op() {
            Op::Identify => self.identify(client_id, &msg).await,
            Op::Console(severity) => self.console(client_id, severity, &msg).await,
            Op::Unknown(op) => {
                tracing::debug!(%client_id, op, raw = text, "unhandled op");
                let source = self.source_name(client_id).await;
                self.event_bus.publish(GatewayEvent::client_log(
                    client_id,
                    source,
                    Severity::Info,
                    format!("unhandled op `{op}`"),
                ));
            }
        }
    }

    async fn identify(&self, client_id: ClientId, msg: &InboundMessage) {
        let Some(name) = msg.str_field("/player/name") else {
            tracing::debug!(%client_id, "identify without player name");
            return;
        };
        let Some(display_name) = self.registry.set_display_name(client_id, name).await else {
            tracing::debug!(%client_id, "identify from unregistered connection");
            return;
        };

        tracing::info!(%client_id, name = %display_name, "client identified");
        self.event_bus.publish(GatewayEvent::ClientIdentified {
            client_id,
            display_name,
            timestamp: Utc::now(),
        });
    }

    async fn console(&self, client_id: ClientId, severity: Severity, msg: &InboundMessage) {
        let Some(message) = msg.str_field("/message") else {
            return;
        };
        let source = self.source_name(client_id).await;
        tracing::debug!(%client_id, %severity, source = %source, "client console output");
        self.event_bus.publish(GatewayEvent::client_log(
            client_id, source, severity, message,
        ));
    }

    async fn source_name(&self, client_id: ClientId) -> String {
        self.registry
            .display_name(client_id)
            .await
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string())
    }
}
