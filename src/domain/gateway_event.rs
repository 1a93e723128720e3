//! Events the core publishes for the presentation layer.
//!
//! Every connection, registry and execute state change is reported as a
//! [`GatewayEvent`] through the [`super::EventBus`]. Consumers (the console
//! presenter, `/events` WebSocket subscribers) apply them to their own state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ClientId, ExecutionOutcome};

/// Severity of a [`GatewayEvent::LogLine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Untagged output (`client/console/print`).
    Print,
    /// Informational.
    Info,
    /// Warning.
    Warn,
    /// Error.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Print => "print",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Source name used for log lines the server itself produces.
pub const SERVER_SOURCE: &str = "server";

/// Notification emitted by the core.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// The client listener is accepting connections.
    ListenerStarted {
        /// Bound address.
        addr: String,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The client listener could not bind; execute is disabled.
    ListenerFailed {
        /// Address the listener attempted to bind.
        addr: String,
        /// Bind error text.
        reason: String,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A connection was registered.
    ClientConnected {
        /// Connection identity.
        client_id: ClientId,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A connection was removed from the registry.
    ClientDisconnected {
        /// Connection identity.
        client_id: ClientId,
        /// Display name at removal.
        display_name: String,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A client identified itself.
    ClientIdentified {
        /// Connection identity.
        client_id: ClientId,
        /// Normalized display name.
        display_name: String,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Derived registry summary after any membership or name change.
    StatusChanged {
        /// Number of registered clients.
        client_count: usize,
        /// Human-readable summary.
        summary: String,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A line of log output, from a client or from the server.
    LogLine {
        /// Originating connection, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        client_id: Option<ClientId>,
        /// Display name of the originator.
        source: String,
        /// Severity tag.
        severity: Severity,
        /// Log text.
        message: String,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An execute request finished dispatching.
    ExecuteCompleted {
        /// Per-client tally.
        outcome: ExecutionOutcome,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl GatewayEvent {
    /// Builds a [`GatewayEvent::LogLine`] attributed to a client.
    #[must_use]
    pub fn client_log(
        client_id: ClientId,
        source: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self::LogLine {
            client_id: Some(client_id),
            source: source.into(),
            severity,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Builds a [`GatewayEvent::LogLine`] attributed to the server.
    #[must_use]
    pub fn server_log(severity: Severity, message: impl Into<String>) -> Self {
        Self::LogLine {
            client_id: None,
            source: SERVER_SOURCE.to_string(),
            severity,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}
