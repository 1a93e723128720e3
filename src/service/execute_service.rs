//! Broadcast of the execute command with per-client failure isolation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;

use crate::domain::{
    ClientRegistry, DispatchReport, EventBus, ExecutionOutcome, GatewayEvent, SendFailure,
};
use crate::error::{GatewayError, SendError};
use crate::ws::messages::ExecuteCommand;

/// Fans the execute command out to all registered clients.
///
/// Stateless apart from the availability flag: the registry is injected,
/// and each call works on its own snapshot, so concurrent calls need no
/// extra locking.
#[derive(Debug)]
pub struct ExecuteService {
    registry: Arc<ClientRegistry>,
    event_bus: EventBus,
    available: AtomicBool,
}

impl ExecuteService {
    /// Creates a new, available `ExecuteService`.
    #[must_use]
    pub fn new(registry: Arc<ClientRegistry>, event_bus: EventBus) -> Self {
        Self {
            registry,
            event_bus,
            available: AtomicBool::new(true),
        }
    }

    /// Disables execute until the process restarts. Called when the
    /// client listener fails to bind.
    pub fn disable(&self) {
        self.available.store(false, Ordering::Release);
    }

    /// Returns `false` once [`ExecuteService::disable`] has been called.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Sends `script` to every client registered at the time of the call.
    ///
    /// The command is serialized once and the same payload is queued for
    /// each client without waiting on any socket. Failed sends are logged
    /// with the client's display name and counted; they never stop the
    /// remaining sends. A client whose connection is already closed is
    /// dropped from the registry.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::ExecuteUnavailable`] if the service was disabled.
    /// - [`GatewayError::Serialization`] if the command cannot be encoded.
    pub async fn execute(&self, script: &str) -> Result<ExecutionOutcome, GatewayError> {
        if !self.is_available() {
            return Err(GatewayError::ExecuteUnavailable);
        }

        let clients = self.registry.snapshot().await;
        if clients.is_empty() {
            tracing::info!("execute requested with no clients connected");
            self.publish_outcome(ExecutionOutcome::NoClients);
            return Ok(ExecutionOutcome::NoClients);
        }

        let payload: Arc<str> = Arc::from(ExecuteCommand::new(script).to_json()?);
        let mut report = DispatchReport::default();

        for client in &clients {
            match client.handle.try_send_text(&payload) {
                Ok(()) => report.succeeded += 1,
                Err(reason) => {
                    self.event_bus.send_failed(
                        client.id(),
                        &client.display_name,
                        "execute command",
                        &reason,
                    );
                    if reason == SendError::Closed {
                        self.registry.remove(client.id()).await;
                    }
                    report.failures.push(SendFailure {
                        client_id: client.id(),
                        display_name: client.display_name.clone(),
                        reason,
                    });
                }
            }
        }

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed(),
            bytes = payload.len(),
            "execute command dispatched"
        );
        let outcome = ExecutionOutcome::Dispatched(report);
        self.publish_outcome(outcome.clone());
        Ok(outcome)
    }

    fn publish_outcome(&self, outcome: ExecutionOutcome) {
        self.event_bus.publish(GatewayEvent::ExecuteCompleted {
            outcome,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{ClientHandle, Outbound, OutboundQueue, Severity};
    use crate::ws::messages::ops;

    fn service() -> (ExecuteService, Arc<ClientRegistry>, EventBus) {
        let bus = EventBus::new(64);
        let registry = Arc::new(ClientRegistry::new(bus.clone()));
        (
            ExecuteService::new(Arc::clone(&registry), bus.clone()),
            registry,
            bus,
        )
    }

    async fn connect(
        registry: &ClientRegistry,
        name: &str,
        capacity: usize,
    ) -> (crate::domain::ClientId, OutboundQueue) {
        let (handle, rx) = ClientHandle::channel(capacity);
        let id = handle.id();
        registry.add(handle).await;
        registry.set_display_name(id, name).await;
        (id, rx)
    }

    #[tokio::test]
    async fn no_clients_sends_nothing() {
        let (svc, registry, _bus) = service();
        let Ok(outcome) = svc.execute("print(1)").await else {
            panic!("execute must not fail");
        };
        assert_eq!(outcome, ExecutionOutcome::NoClients);
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn every_client_gets_the_same_payload() {
        let (svc, registry, _bus) = service();
        let (_a, mut ra) = connect(&registry, "A", 4).await;
        let (_b, mut rb) = connect(&registry, "B", 4).await;

        let Ok(outcome) = svc.execute("print(\"hi\")\n").await else {
            panic!("execute must not fail");
        };
        assert_eq!(outcome.succeeded(), 2);
        assert_eq!(outcome.failed(), 0);

        let (Some(Outbound::Text(pa)), Some(Outbound::Text(pb))) = (ra.recv().await, rb.recv().await)
        else {
            panic!("both clients must receive a text frame");
        };
        assert!(Arc::ptr_eq(&pa, &pb));
        let Ok(cmd) = serde_json::from_str::<ExecuteCommand>(&pa) else {
            panic!("payload parses");
        };
        assert_eq!(cmd.op, ops::EXECUTE);
        assert_eq!(cmd.script(), "print(\"hi\")\n");
    }

    #[tokio::test]
    async fn closed_client_is_isolated_and_named() {
        let (svc, registry, bus) = service();
        let mut events = bus.subscribe();
        let (_ok, mut ok_rx) = connect(&registry, "Alive", 4).await;
        let (dead_id, dead_rx) = connect(&registry, "Gone", 4).await;
        drop(dead_rx);

        let Ok(ExecutionOutcome::Dispatched(report)) = svc.execute("print(1)").await else {
            panic!("expected a dispatched outcome");
        };
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failed_clients(), vec!["Gone"]);
        assert!(matches!(ok_rx.recv().await, Some(Outbound::Text(_))));

        assert_eq!(registry.count().await, 1);
        assert!(registry.display_name(dead_id).await.is_none());

        let mut saw_error_log = false;
        while let Ok(event) = events.try_recv() {
            if let GatewayEvent::LogLine {
                severity: Severity::Error,
                message,
                ..
            } = event
            {
                saw_error_log |= message.contains("Gone");
            }
        }
        assert!(saw_error_log);
    }

    #[tokio::test]
    async fn backpressure_counts_as_failure_but_keeps_client() {
        let (svc, registry, _bus) = service();
        let (slow_id, _slow_rx) = connect(&registry, "Slow", 1).await;
        let (_fast, _fast_rx) = connect(&registry, "Fast", 4).await;

        assert!(svc.execute("first").await.is_ok());
        let Ok(outcome) = svc.execute("second").await else {
            panic!("execute must not fail");
        };
        let ExecutionOutcome::Dispatched(report) = outcome else {
            panic!("expected a dispatched outcome");
        };
        assert_eq!(report.succeeded, 1);
        assert_eq!(
            report.failures.first().map(|f| f.reason),
            Some(SendError::Backpressure)
        );
        assert_eq!(registry.display_name(slow_id).await.as_deref(), Some("Slow"));
    }

    #[tokio::test]
    async fn disabled_service_refuses() {
        let (svc, registry, _bus) = service();
        let (_a, mut ra) = connect(&registry, "A", 4).await;
        svc.disable();
        assert!(!svc.is_available());
        assert!(matches!(
            svc.execute("print(1)").await,
            Err(GatewayError::ExecuteUnavailable)
        ));
        assert!(ra.try_recv().is_none());
    }

    #[tokio::test]
    async fn outcome_is_published() {
        let (svc, _registry, bus) = service();
        let mut events = bus.subscribe();
        assert!(svc.execute("").await.is_ok());
        let Ok(GatewayEvent::ExecuteCompleted { outcome, .. }) = events.try_recv() else {
            panic!("expected an execute event");
        };
        assert_eq!(outcome, ExecutionOutcome::NoClients);
    }
}
