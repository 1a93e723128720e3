//! WebSocket layer for remote clients: upgrade, connection loop, protocol.
//!
//! Clients connect to the transport listener, send JSON frames that the
//! [`dispatcher::Dispatcher`] routes by `op`, and receive the execute
//! command through their per-connection outbound queue.

pub mod connection;
pub mod dispatcher;
pub mod handler;
pub mod messages;

pub use connection::ConnectionContext;
pub use dispatcher::Dispatcher;
