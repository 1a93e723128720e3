//! End-to-end tests: a real client listener and control API on loopback,
//! driven by `tokio-tungstenite` clients and `reqwest`.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use exec_gateway::api::build_app;
use exec_gateway::api::cooldown::ExecuteCooldown;
use exec_gateway::app_state::AppState;
use exec_gateway::domain::{ClientRegistry, EventBus, GatewayEvent, Severity};
use exec_gateway::error::GatewayError;
use exec_gateway::server::WsServer;
use exec_gateway::service::ExecuteService;
use exec_gateway::ws::ConnectionContext;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

struct Harness {
    ws_addr: SocketAddr,
    api_addr: SocketAddr,
    registry: Arc<ClientRegistry>,
    events: broadcast::Receiver<GatewayEvent>,
    shutdown: Option<oneshot::Sender<()>>,
}

fn loopback() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}

async fn start() -> Harness {
    let bus = EventBus::new(1_024);
    let events = bus.subscribe();
    let registry = Arc::new(ClientRegistry::new(bus.clone()));
    let execute_service = Arc::new(ExecuteService::new(Arc::clone(&registry), bus.clone()));
    let ctx = ConnectionContext::new(Arc::clone(&registry), bus.clone(), 16);

    let Ok(server) = WsServer::bind(loopback(), ctx, &execute_service).await else {
        panic!("client listener binds on loopback");
    };
    let ws_addr = server.local_addr();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(server.serve(async move {
        let _ = shutdown_rx.await;
    }));

    let app = build_app(AppState {
        registry: Arc::clone(&registry),
        execute_service,
        event_bus: bus,
        cooldown: Arc::new(ExecuteCooldown::new(Duration::ZERO)),
    });
    let Ok(listener) = tokio::net::TcpListener::bind(loopback()).await else {
        panic!("control API binds on loopback");
    };
    let Ok(api_addr) = listener.local_addr() else {
        panic!("bound address");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Harness {
        ws_addr,
        api_addr,
        registry,
        events,
        shutdown: Some(shutdown_tx),
    }
}

async fn connect(addr: SocketAddr) -> Client {
    let Ok((client, _response)) = tokio_tungstenite::connect_async(format!("ws://{addr}/")).await
    else {
        panic!("websocket handshake");
    };
    client
}

async fn send(client: &mut Client, frame: &str) {
    if client.send(Message::text(frame.to_string())).await.is_err() {
        panic!("client send failed");
    }
}

async fn wait_for_event<F>(rx: &mut broadcast::Receiver<GatewayEvent>, mut pred: F) -> GatewayEvent
where
    F: FnMut(&GatewayEvent) -> bool,
{
    let found = tokio::time::timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return Some(event),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await;
    let Ok(Some(event)) = found else {
        panic!("expected event was not published");
    };
    event
}

async fn wait_for_count(rx: &mut broadcast::Receiver<GatewayEvent>, count: usize) {
    wait_for_event(rx, |e| {
        matches!(e, GatewayEvent::StatusChanged { client_count, .. } if *client_count == count)
    })
    .await;
}

async fn next_text(client: &mut Client) -> String {
    let frame = tokio::time::timeout(WAIT, client.next()).await;
    let Ok(Some(Ok(Message::Text(text)))) = frame else {
        panic!("expected a text frame");
    };
    text.as_str().to_string()
}

async fn post_execute(api_addr: SocketAddr, script: &str) -> Value {
    let response = reqwest::Client::new()
        .post(format!("http://{api_addr}/api/v1/execute"))
        .json(&json!({ "script": script }))
        .send()
        .await;
    let Ok(response) = response else {
        panic!("control API reachable");
    };
    assert!(response.status().is_success());
    let Ok(body) = response.json::<Value>().await else {
        panic!("json body");
    };
    body
}

#[tokio::test]
async fn identify_then_console_output_is_attributed() {
    let mut h = start().await;
    let mut client = connect(h.ws_addr).await;

    send(
        &mut client,
        r#"{"op":"client/identify","data":{"player":{"name":"Rex"}}}"#,
    )
    .await;
    wait_for_event(&mut h.events, |e| {
        matches!(e, GatewayEvent::ClientIdentified { display_name, .. } if display_name == "Rex")
    })
    .await;

    send(
        &mut client,
        r#"{"op":"client/console/warn","data":{"message":"low memory"}}"#,
    )
    .await;
    let event = wait_for_event(&mut h.events, |e| matches!(e, GatewayEvent::LogLine { .. })).await;
    let GatewayEvent::LogLine {
        source,
        severity,
        message,
        ..
    } = event
    else {
        panic!("filtered on log lines");
    };
    assert_eq!(source, "Rex");
    assert_eq!(severity, Severity::Warn);
    assert_eq!(message, "low memory");

    let Ok(response) = reqwest::get(format!("http://{}/api/v1/clients", h.api_addr)).await else {
        panic!("control API reachable");
    };
    let Ok(body) = response.json::<Value>().await else {
        panic!("json body");
    };
    assert_eq!(body["count"], 1);
    assert_eq!(body["status"], "Connected: Rex");
    assert_eq!(body["clients"][0]["display_name"], "Rex");
}

#[tokio::test]
async fn execute_delivers_exact_wire_payload_to_every_client() {
    let mut h = start().await;
    let mut first = connect(h.ws_addr).await;
    let mut second = connect(h.ws_addr).await;
    wait_for_count(&mut h.events, 2).await;

    let script = "print(\"hi\")\nwarn('x')\t\\";
    let body = post_execute(h.api_addr, script).await;
    assert_eq!(body["status"], "dispatched");
    assert_eq!(body["succeeded"], 2);
    assert_eq!(body["failed"], 0);

    let expected = json!({
        "op": "client/onDidTextDocumentExecute",
        "data": { "textDocument": { "text": script } }
    });
    for client in [&mut first, &mut second] {
        let text = next_text(client).await;
        let Ok(received) = serde_json::from_str::<Value>(&text) else {
            panic!("payload is JSON");
        };
        assert_eq!(received, expected);
    }
}

#[tokio::test]
async fn execute_without_clients_reports_no_clients() {
    let h = start().await;
    let body = post_execute(h.api_addr, "print(1)").await;
    assert_eq!(body["status"], "no_clients");
    assert_eq!(h.registry.count().await, 0);
}

#[tokio::test]
async fn client_close_unregisters() {
    let mut h = start().await;
    let mut client = connect(h.ws_addr).await;
    wait_for_count(&mut h.events, 1).await;

    if client.close(None).await.is_err() {
        panic!("close handshake");
    }
    wait_for_event(&mut h.events, |e| {
        matches!(e, GatewayEvent::ClientDisconnected { display_name, .. } if display_name == "Client")
    })
    .await;
    assert_eq!(h.registry.count().await, 0);
}

#[tokio::test]
async fn malformed_frame_keeps_connection_open() {
    let mut h = start().await;
    let mut client = connect(h.ws_addr).await;

    send(&mut client, "definitely not json").await;
    wait_for_event(&mut h.events, |e| {
        matches!(e, GatewayEvent::LogLine { severity: Severity::Warn, .. })
    })
    .await;

    send(
        &mut client,
        r#"{"op":"client/identify","data":{"player":{"name":"Still here"}}}"#,
    )
    .await;
    wait_for_event(&mut h.events, |e| {
        matches!(e, GatewayEvent::ClientIdentified { display_name, .. } if display_name == "Still here")
    })
    .await;
    assert_eq!(h.registry.count().await, 1);
}

#[tokio::test]
async fn shutdown_closes_tracked_connections() {
    let mut h = start().await;
    let mut client = connect(h.ws_addr).await;
    wait_for_count(&mut h.events, 1).await;

    if let Some(shutdown) = h.shutdown.take() {
        let _ = shutdown.send(());
    }

    let frame = tokio::time::timeout(WAIT, client.next()).await;
    let Ok(frame) = frame else {
        panic!("connection was not closed on shutdown");
    };
    assert!(matches!(frame, Some(Ok(Message::Close(_)) | Err(_)) | None));
}

#[tokio::test]
async fn bind_failure_is_reported_once_and_disables_execute() {
    let Ok(occupied) = tokio::net::TcpListener::bind(loopback()).await else {
        panic!("bind loopback");
    };
    let Ok(addr) = occupied.local_addr() else {
        panic!("bound address");
    };

    let bus = EventBus::new(16);
    let mut events = bus.subscribe();
    let registry = Arc::new(ClientRegistry::new(bus.clone()));
    let execute_service = Arc::new(ExecuteService::new(Arc::clone(&registry), bus.clone()));
    let ctx = ConnectionContext::new(Arc::clone(&registry), bus.clone(), 16);

    let result = WsServer::bind(addr, ctx, &execute_service).await;
    assert!(matches!(result, Err(GatewayError::Bind { .. })));

    let Ok(GatewayEvent::ListenerFailed { addr: failed, .. }) = events.try_recv() else {
        panic!("expected a listener failure event");
    };
    assert_eq!(failed, addr.to_string());
    assert!(events.try_recv().is_err());

    assert!(!execute_service.is_available());
    assert!(matches!(
        execute_service.execute("print(1)").await,
        Err(GatewayError::ExecuteUnavailable)
    ));

    let app = build_app(AppState {
        registry,
        execute_service,
        event_bus: bus,
        cooldown: Arc::new(ExecuteCooldown::new(Duration::ZERO)),
    });
    let Ok(listener) = tokio::net::TcpListener::bind(loopback()).await else {
        panic!("control API binds on loopback");
    };
    let Ok(api_addr) = listener.local_addr() else {
        panic!("bound address");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let response = reqwest::Client::new()
        .post(format!("http://{api_addr}/api/v1/execute"))
        .json(&json!({ "script": "print(1)" }))
        .send()
        .await;
    let Ok(response) = response else {
        panic!("control API reachable");
    };
    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
}
