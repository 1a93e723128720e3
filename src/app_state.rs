//! Shared application state injected into all control API handlers.

use std::sync::Arc;

use crate::api::cooldown::ExecuteCooldown;
use crate::domain::{ClientRegistry, EventBus};
use crate::service::ExecuteService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Registry of attached clients (read-only from the API).
    pub registry: Arc<ClientRegistry>,
    /// Broadcast of the execute command.
    pub execute_service: Arc<ExecuteService>,
    /// Event bus for `/events` subscribers.
    pub event_bus: EventBus,
    /// Operator-facing execute cooldown.
    pub cooldown: Arc<ExecuteCooldown>,
}
