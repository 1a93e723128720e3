//! exec-gateway server entry point.
//!
//! Binds the client WebSocket listener and the operator control API, and
//! runs both until Ctrl-C or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use exec_gateway::api;
use exec_gateway::api::cooldown::ExecuteCooldown;
use exec_gateway::app_state::AppState;
use exec_gateway::config::{GatewayConfig, LogFormat};
use exec_gateway::console;
use exec_gateway::domain::{ClientRegistry, EventBus};
use exec_gateway::server::WsServer;
use exec_gateway::service::ExecuteService;
use exec_gateway::ws::ConnectionContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so `.env` can set RUST_LOG
    let config = GatewayConfig::from_env().context("failed to load configuration")?;
    init_tracing(config.log_format);
    tracing::info!(
        client_addr = %config.client_listen_addr,
        control_addr = %config.control_listen_addr,
        "starting exec-gateway"
    );

    // Build domain layer
    let event_bus = EventBus::new(config.event_bus_capacity);
    let presenter = tokio::spawn(console::run(event_bus.subscribe()));
    let registry = Arc::new(ClientRegistry::new(event_bus.clone()));

    // Build service layer
    let execute_service = Arc::new(ExecuteService::new(
        Arc::clone(&registry),
        event_bus.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    // Client listener; a bind failure leaves the control API up with execute disabled
    let ctx = ConnectionContext::new(
        Arc::clone(&registry),
        event_bus.clone(),
        config.outbound_queue_capacity,
    );
    let transport = match WsServer::bind(config.client_listen_addr, ctx, &execute_service).await {
        Ok(server) => Some(tokio::spawn(server.serve(wait_for(shutdown_rx.clone())))),
        Err(err) => {
            tracing::error!(%err, "continuing without client listener");
            None
        }
    };

    // Control API
    let app_state = AppState {
        registry,
        execute_service,
        event_bus,
        cooldown: Arc::new(ExecuteCooldown::new(config.execute_cooldown)),
    };
    let app = api::build_app(app_state);
    let listener = tokio::net::TcpListener::bind(config.control_listen_addr)
        .await
        .with_context(|| format!("failed to bind control API on {}", config.control_listen_addr))?;
    tracing::info!(addr = %config.control_listen_addr, "control API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for(shutdown_rx))
        .await
        .context("control API failed")?;

    if let Some(transport) = transport {
        transport.await.context("client listener task failed")??;
    }
    presenter.abort();

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

async fn wait_for(mut shutdown_rx: watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(%err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::warn!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
