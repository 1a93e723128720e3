//! Service layer: operator-triggered operations.
//!
//! [`ExecuteService`] broadcasts the execute command to every registered
//! client and reports the outcome through the [`super::domain::EventBus`].

pub mod execute_service;

pub use execute_service::ExecuteService;
