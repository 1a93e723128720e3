//! Transport listener for client WebSocket connections.
//!
//! [`WsServer`] owns the bound TCP listener. Binding reports success or
//! failure on the event bus exactly once, and a failure disables execute
//! for the life of the process. Serving accepts upgrades on any path until
//! the shutdown future resolves, then asks every tracked connection to
//! close.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use chrono::Utc;
use tokio::net::TcpListener;

use crate::domain::GatewayEvent;
use crate::error::GatewayError;
use crate::service::ExecuteService;
use crate::ws::ConnectionContext;
use crate::ws::handler::ws_handler;

/// Bound client listener, ready to serve.
#[derive(Debug)]
pub struct WsServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    ctx: ConnectionContext,
}

impl WsServer {
    /// Binds the client listener.
    ///
    /// Publishes [`GatewayEvent::ListenerStarted`] on success. On failure
    /// publishes [`GatewayEvent::ListenerFailed`] and disables
    /// `execute_service` until restart.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Bind`] if the address cannot be bound
    /// (already in use, permission denied, ...). Not retried.
    pub async fn bind(
        addr: SocketAddr,
        ctx: ConnectionContext,
        execute_service: &ExecuteService,
    ) -> Result<Self, GatewayError> {
        let bound = TcpListener::bind(addr)
            .await
            .and_then(|listener| listener.local_addr().map(|local| (listener, local)));

        match bound {
            Ok((listener, local_addr)) => {
                tracing::info!(addr = %local_addr, "client listener bound");
                ctx.event_bus.publish(GatewayEvent::ListenerStarted {
                    addr: local_addr.to_string(),
                    timestamp: Utc::now(),
                });
                Ok(Self {
                    listener,
                    local_addr,
                    ctx,
                })
            }
            Err(source) => {
                tracing::error!(%addr, err = %source, "client listener failed to bind; execute disabled");
                execute_service.disable();
                ctx.event_bus.publish(GatewayEvent::ListenerFailed {
                    addr: addr.to_string(),
                    reason: source.to_string(),
                    timestamp: Utc::now(),
                });
                Err(GatewayError::Bind { addr, source })
            }
        }
    }

    /// Returns the bound address (useful when binding port `0`).
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts client connections until `shutdown` resolves.
    ///
    /// On shutdown every registered connection is asked to close, as is
    /// any upgrade that completes afterwards, and the listening socket is
    /// released when this returns.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Io`] if the accept loop fails.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let registry = Arc::clone(&self.ctx.registry);
        let app = Router::new().fallback(ws_handler).with_state(self.ctx);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                let asked = registry.close_all().await;
                tracing::info!(connections = asked, "closing client connections");
            })
            .await?;

        tracing::info!(addr = %self.local_addr, "client listener stopped");
        Ok(())
    }
}
