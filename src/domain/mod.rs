//! Domain layer: connection identity, the client registry, and events.
//!
//! This module contains the server-side model of attached clients, the
//! typed events the core reports, and the event bus that carries them to
//! presentation consumers.

pub mod client_entry;
pub mod client_id;
pub mod client_registry;
pub mod event_bus;
pub mod execution_outcome;
pub mod gateway_event;

pub use client_entry::{ClientEntry, ClientHandle, ClientSummary, Outbound, OutboundQueue};
pub use client_id::ClientId;
pub use client_registry::ClientRegistry;
pub use event_bus::EventBus;
pub use execution_outcome::{DispatchReport, ExecutionOutcome, SendFailure};
pub use gateway_event::{GatewayEvent, Severity};
