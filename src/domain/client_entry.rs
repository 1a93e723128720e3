//! Registry entry for one connection, plus its send handle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Notify, mpsc};

use super::ClientId;
use crate::error::SendError;

/// Display name of a connection that has not identified yet.
pub const DEFAULT_DISPLAY_NAME: &str = "Client";

/// Display name used when an identify message carries a blank name.
pub const FALLBACK_DISPLAY_NAME: &str = "Unknown";

/// Normalizes a client-supplied display name.
///
/// Empty or whitespace-only names become [`FALLBACK_DISPLAY_NAME`]; any
/// other string is kept exactly as given.
#[must_use]
pub fn normalize_display_name(name: &str) -> String {
    if name.trim().is_empty() {
        FALLBACK_DISPLAY_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Frame handed to a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Pre-serialized text frame. Shared between all recipients of a broadcast.
    Text(Arc<str>),
    /// Send a close frame and stop writing.
    Close,
}

/// Opaque handle to a live connection.
///
/// Wraps the bounded queue drained by the connection's writer task. All
/// sends are non-blocking: a full queue or a stopped writer is reported
/// as a [`SendError`] instead of waiting. Close requests travel beside the
/// queue, so they are never refused for lack of space.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    id: ClientId,
    sender: mpsc::Sender<Arc<str>>,
    close: Arc<Notify>,
}

impl ClientHandle {
    /// Creates a handle with a fresh [`ClientId`] and the receiving end of
    /// its outbound queue. `capacity` is clamped to at least one frame.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, OutboundQueue) {
        let (sender, frames) = mpsc::channel(capacity.max(1));
        let close = Arc::new(Notify::new());
        (
            Self {
                id: ClientId::new(),
                sender,
                close: Arc::clone(&close),
            },
            OutboundQueue { frames, close },
        )
    }

    /// Returns the connection identity.
    #[must_use]
    pub const fn id(&self) -> ClientId {
        self.id
    }

    /// Queues a text frame.
    ///
    /// # Errors
    ///
    /// [`SendError::Closed`] if the writer has stopped,
    /// [`SendError::Backpressure`] if the queue is full.
    pub fn try_send_text(&self, payload: &Arc<str>) -> Result<(), SendError> {
        self.sender
            .try_send(Arc::clone(payload))
            .map_err(SendError::from)
    }

    /// Asks the writer to send a close frame ahead of anything still queued.
    ///
    /// The request is remembered until the writer next polls, so it is not
    /// lost if the writer is busy with a frame.
    pub fn close(&self) {
        self.close.notify_one();
    }
}

/// Receiving end of a [`ClientHandle`], owned by the writer task.
#[derive(Debug)]
pub struct OutboundQueue {
    frames: mpsc::Receiver<Arc<str>>,
    close: Arc<Notify>,
}

impl OutboundQueue {
    /// Waits for the next frame. A pending close request wins over queued
    /// text. Returns `None` once every handle is dropped.
    pub async fn recv(&mut self) -> Option<Outbound> {
        tokio::select! {
            biased;
            () = self.close.notified() => Some(Outbound::Close),
            frame = self.frames.recv() => frame.map(Outbound::Text),
        }
    }

    /// Returns the next queued text frame without waiting.
    pub fn try_recv(&mut self) -> Option<Outbound> {
        self.frames.try_recv().ok().map(Outbound::Text)
    }
}

/// One registered connection.
#[derive(Debug, Clone)]
pub struct ClientEntry {
    /// Send handle and identity.
    pub handle: ClientHandle,
    /// Current display name.
    pub display_name: String,
    /// When the connection was registered.
    pub connected_at: DateTime<Utc>,
}

impl ClientEntry {
    /// Creates an entry with the default display name.
    #[must_use]
    pub fn new(handle: ClientHandle) -> Self {
        Self {
            handle,
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            connected_at: Utc::now(),
        }
    }

    /// Returns the connection identity.
    #[must_use]
    pub const fn id(&self) -> ClientId {
        self.handle.id()
    }
}

/// Lightweight view of an entry for listings.
#[derive(Debug, Clone, Serialize)]
pub struct ClientSummary {
    /// Connection identity.
    pub client_id: ClientId,
    /// Current display name.
    pub display_name: String,
    /// Registration timestamp.
    pub connected_at: DateTime<Utc>,
}

impl From<&ClientEntry> for ClientSummary {
    fn from(entry: &ClientEntry) -> Self {
        Self {
            client_id: entry.id(),
            display_name: entry.display_name.clone(),
            connected_at: entry.connected_at,
        }
    }
}
