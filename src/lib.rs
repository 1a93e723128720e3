//! # exec-gateway
//!
//! WebSocket control server for remote script clients.
//!
//! Remote client processes connect over WebSocket, identify themselves and
//! stream console output; an operator broadcasts a script to every attached
//! client through the control API. Per-client send failures are isolated
//! and reported, never fatal.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket)               Operator (HTTP)
//!     │                                  │
//!     ├── WsServer (server)              ├── Control API (api/)
//!     ├── Connection loop (ws/)          │
//!     ├── Dispatcher (ws/)               ├── ExecuteService (service/)
//!     │                                  │
//!     └──────── ClientRegistry (domain/) ┘
//!                     │
//!               EventBus (domain/) ──► console presenter, /events
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod console;
pub mod domain;
pub mod error;
pub mod server;
pub mod service;
pub mod ws;
