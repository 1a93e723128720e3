//! Concurrent, insertion-ordered store of live connections.
//!
//! [`ClientRegistry`] keeps every registered connection in a `Vec` behind a
//! [`tokio::sync::RwLock`]. Every effective mutation publishes a derived
//! [`GatewayEvent::StatusChanged`] while the write lock is still held, so
//! consumers observe summaries in mutation order.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;

use super::client_entry::{ClientEntry, ClientHandle, ClientSummary, normalize_display_name};
use super::{ClientId, EventBus, GatewayEvent};

/// Summary shown while nobody is connected.
pub const WAITING_SUMMARY: &str = "Waiting for clients...";

/// Builds the human-readable status line for a set of entries.
#[must_use]
pub fn status_summary(clients: &[ClientEntry]) -> String {
    match clients {
        [] => WAITING_SUMMARY.to_string(),
        [only] => format!("Connected: {}", only.display_name),
        many => format!("{} clients connected", many.len()),
    }
}

/// The authoritative set of currently open connections.
///
/// # Concurrency
///
/// - All reads and writes go through one `RwLock`; critical sections never
///   await anything but the lock itself.
/// - [`ClientRegistry::snapshot`] returns an owned copy, so callers can
///   iterate and send while other tasks add or remove entries.
#[derive(Debug)]
pub struct ClientRegistry {
    clients: RwLock<Vec<ClientEntry>>,
    event_bus: EventBus,
    closing: AtomicBool,
}

impl ClientRegistry {
    /// Creates an empty registry reporting to `event_bus`.
    #[must_use]
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            clients: RwLock::new(Vec::new()),
            event_bus,
            closing: AtomicBool::new(false),
        }
    }

    /// Registers a connection under the default display name.
    ///
    /// Adding an id that is already registered is ignored. Once
    /// [`ClientRegistry::close_all`] has run, new connections are still
    /// registered but asked to close straight away.
    pub async fn add(&self, handle: ClientHandle) {
        let client_id = handle.id();
        let mut clients = self.clients.write().await;
        if clients.iter().any(|c| c.id() == client_id) {
            tracing::debug!(%client_id, "client already registered");
            return;
        }
        if self.closing.load(Ordering::Acquire) {
            tracing::debug!(%client_id, "client arrived during shutdown");
            handle.close();
        }
        clients.push(ClientEntry::new(handle));

        self.event_bus.publish(GatewayEvent::ClientConnected {
            client_id,
            timestamp: Utc::now(),
        });
        self.publish_status(&clients);
        tracing::info!(%client_id, count = clients.len(), "client registered");
    }

    /// Removes a connection, returning its entry. No-op if absent.
    pub async fn remove(&self, client_id: ClientId) -> Option<ClientEntry> {
        let mut clients = self.clients.write().await;
        let pos = clients.iter().position(|c| c.id() == client_id)?;
        let entry = clients.remove(pos);

        self.event_bus.publish(GatewayEvent::ClientDisconnected {
            client_id,
            display_name: entry.display_name.clone(),
            timestamp: Utc::now(),
        });
        self.publish_status(&clients);
        tracing::info!(%client_id, name = %entry.display_name, count = clients.len(), "client removed");
        Some(entry)
    }

    /// Sets a connection's display name, normalizing blank names.
    ///
    /// Returns the stored name, or `None` if the connection is not
    /// registered.
    pub async fn set_display_name(&self, client_id: ClientId, name: &str) -> Option<String> {
        let mut clients = self.clients.write().await;
        let entry = clients.iter_mut().find(|c| c.id() == client_id)?;
        entry.display_name = normalize_display_name(name);
        let stored = entry.display_name.clone();

        self.publish_status(&clients);
        Some(stored)
    }

    /// Returns the current display name of a connection.
    pub async fn display_name(&self, client_id: ClientId) -> Option<String> {
        self.clients
            .read()
            .await
            .iter()
            .find(|c| c.id() == client_id)
            .map(|c| c.display_name.clone())
    }

    /// Returns the number of registered connections.
    pub async fn count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Returns a point-in-time copy of all entries in insertion order.
    pub async fn snapshot(&self) -> Vec<ClientEntry> {
        self.clients.read().await.clone()
    }

    /// Returns listing summaries in insertion order.
    pub async fn summaries(&self) -> Vec<ClientSummary> {
        self.clients
            .read()
            .await
            .iter()
            .map(ClientSummary::from)
            .collect()
    }

    /// Returns the current status line.
    pub async fn status_summary(&self) -> String {
        status_summary(&self.clients.read().await)
    }

    /// Asks every registered connection to close, and every connection
    /// registered from now on.
    ///
    /// Entries leave the registry as their connection tasks observe the
    /// close. Returns the number of connections asked.
    pub async fn close_all(&self) -> usize {
        let clients = self.clients.read().await;
        self.closing.store(true, Ordering::Release);
        for client in clients.iter() {
            client.handle.close();
        }
        clients.len()
    }

    fn publish_status(&self, clients: &[ClientEntry]) {
        self.event_bus.publish(GatewayEvent::StatusChanged {
            client_count: clients.len(),
            summary: status_summary(clients),
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::broadcast;

    use super::*;
    use crate::domain::client_entry::{
        DEFAULT_DISPLAY_NAME, FALLBACK_DISPLAY_NAME, Outbound,
    };

    fn registry() -> (ClientRegistry, broadcast::Receiver<GatewayEvent>) {
        let bus = EventBus::new(64);
        let rx = bus.subscribe();
        (ClientRegistry::new(bus), rx)
    }

    fn last_summary(rx: &mut broadcast::Receiver<GatewayEvent>) -> Option<String> {
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            if let GatewayEvent::StatusChanged { summary, .. } = event {
                last = Some(summary);
            }
        }
        last
    }

    #[tokio::test]
    async fn count_tracks_opens_minus_closes() {
        let (reg, _rx) = registry();
        let (a, _ra) = ClientHandle::channel(1);
        let (b, _rb) = ClientHandle::channel(1);
        let (a_id, b_id) = (a.id(), b.id());

        reg.add(a).await;
        reg.add(b).await;
        assert_eq!(reg.count().await, 2);

        assert!(reg.remove(a_id).await.is_some());
        assert!(reg.remove(a_id).await.is_none());
        assert_eq!(reg.count().await, 1);

        assert!(reg.remove(b_id).await.is_some());
        assert!(reg.remove(b_id).await.is_none());
        assert_eq!(reg.count().await, 0);
    }

    #[tokio::test]
    async fn removing_unknown_id_publishes_nothing() {
        let (reg, mut rx) = registry();
        assert!(reg.remove(ClientId::new()).await.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn duplicate_add_is_ignored() {
        let (reg, _rx) = registry();
        let (a, _ra) = ClientHandle::channel(1);
        reg.add(a.clone()).await;
        reg.add(a).await;
        assert_eq!(reg.count().await, 1);
    }

    #[tokio::test]
    async fn snapshot_preserves_insertion_order() {
        let (reg, _rx) = registry();
        let mut ids = Vec::new();
        let mut receivers = Vec::new();
        for _ in 0..4 {
            let (h, r) = ClientHandle::channel(1);
            ids.push(h.id());
            receivers.push(r);
            reg.add(h).await;
        }
        let snapshot_ids: Vec<ClientId> = reg.snapshot().await.iter().map(ClientEntry::id).collect();
        assert_eq!(snapshot_ids, ids);
    }

    #[tokio::test]
    async fn snapshot_is_detached_from_later_mutation() {
        let (reg, _rx) = registry();
        let (a, _ra) = ClientHandle::channel(1);
        let a_id = a.id();
        reg.add(a).await;

        let snapshot = reg.snapshot().await;
        reg.remove(a_id).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(reg.count().await, 0);
    }

    #[tokio::test]
    async fn display_name_normalization() {
        let (reg, _rx) = registry();
        let (a, _ra) = ClientHandle::channel(1);
        let a_id = a.id();
        reg.add(a).await;
        assert_eq!(
            reg.display_name(a_id).await.as_deref(),
            Some(DEFAULT_DISPLAY_NAME)
        );

        assert_eq!(
            reg.set_display_name(a_id, "  ").await.as_deref(),
            Some(FALLBACK_DISPLAY_NAME)
        );
        assert_eq!(
            reg.set_display_name(a_id, "Rex").await.as_deref(),
            Some("Rex")
        );
        assert_eq!(reg.display_name(a_id).await.as_deref(), Some("Rex"));
    }

    #[tokio::test]
    async fn rename_of_unknown_client_is_none() {
        let (reg, _rx) = registry();
        assert!(reg.set_display_name(ClientId::new(), "Rex").await.is_none());
    }

    #[tokio::test]
    async fn status_summary_follows_membership() {
        let (reg, mut rx) = registry();
        assert_eq!(reg.status_summary().await, WAITING_SUMMARY);

        let (a, _ra) = ClientHandle::channel(1);
        let a_id = a.id();
        reg.add(a).await;
        assert_eq!(last_summary(&mut rx).as_deref(), Some("Connected: Client"));

        reg.set_display_name(a_id, "Rex").await;
        assert_eq!(last_summary(&mut rx).as_deref(), Some("Connected: Rex"));

        let (b, _rb) = ClientHandle::channel(1);
        reg.add(b).await;
        assert_eq!(last_summary(&mut rx).as_deref(), Some("2 clients connected"));

        reg.remove(a_id).await;
        assert_eq!(last_summary(&mut rx).as_deref(), Some("Connected: Client"));
    }

    #[tokio::test]
    async fn remove_reports_display_name() {
        let (reg, mut rx) = registry();
        let (a, _ra) = ClientHandle::channel(1);
        let a_id = a.id();
        reg.add(a).await;
        reg.set_display_name(a_id, "Rex").await;
        while rx.try_recv().is_ok() {}

        reg.remove(a_id).await;
        let Ok(GatewayEvent::ClientDisconnected { display_name, .. }) = rx.try_recv() else {
            panic!("expected a disconnect event first");
        };
        assert_eq!(display_name, "Rex");
    }

    #[tokio::test]
    async fn close_all_signals_every_connection() {
        let (reg, _rx) = registry();
        let (a, mut ra) = ClientHandle::channel(1);
        let (b, rb) = ClientHandle::channel(1);
        reg.add(a).await;
        reg.add(b).await;
        drop(rb);

        assert_eq!(reg.close_all().await, 2);
        assert_eq!(ra.recv().await, Some(Outbound::Close));
    }

    #[tokio::test]
    async fn close_all_reaches_a_client_with_a_full_queue() {
        let (reg, _rx) = registry();
        let (a, mut ra) = ClientHandle::channel(1);
        let payload: Arc<str> = Arc::from("busy");
        assert!(a.try_send_text(&payload).is_ok());
        reg.add(a).await;

        assert_eq!(reg.close_all().await, 1);
        assert_eq!(ra.recv().await, Some(Outbound::Close));
    }

    #[tokio::test]
    async fn client_added_after_close_all_is_closed() {
        let (reg, _rx) = registry();
        assert_eq!(reg.close_all().await, 0);

        let (late, mut late_rx) = ClientHandle::channel(1);
        reg.add(late).await;
        assert_eq!(reg.count().await, 1);
        assert_eq!(late_rx.recv().await, Some(Outbound::Close));
    }
}
