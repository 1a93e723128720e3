//! Console presenter: the default consumer of core events.
//!
//! A single task drains the [`EventBus`](crate::domain::EventBus) and
//! renders each [`GatewayEvent`] as a log record. It is the only place
//! that turns events into presentation; the core never formats output
//! for a UI itself.

use tokio::sync::broadcast;

use crate::domain::{ExecutionOutcome, GatewayEvent, Severity};

/// One rendered line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    /// Severity to log it at.
    pub severity: Severity,
    /// Rendered text.
    pub text: String,
}

impl ConsoleLine {
    fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }
}

/// Presentation state derived from the event stream.
#[derive(Debug, Default)]
pub struct ConsolePresenter {
    status: Option<String>,
}

impl ConsolePresenter {
    /// Creates a presenter with no status yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an event, returning the line to print, if any.
    ///
    /// Repeated identical status summaries are suppressed.
    pub fn apply(&mut self, event: &GatewayEvent) -> Option<ConsoleLine> {
        match event {
            GatewayEvent::ListenerStarted { addr, .. } => Some(ConsoleLine::new(
                Severity::Info,
                format!("listening for clients on {addr}"),
            )),
            GatewayEvent::ListenerFailed { addr, reason, .. } => Some(ConsoleLine::new(
                Severity::Error,
                format!("could not listen on {addr}: {reason}; execute disabled until restart"),
            )),
            GatewayEvent::ClientConnected { .. } => {
                Some(ConsoleLine::new(Severity::Info, "client connected"))
            }
            GatewayEvent::ClientDisconnected { display_name, .. } => Some(ConsoleLine::new(
                Severity::Info,
                format!("{display_name} disconnected"),
            )),
            GatewayEvent::ClientIdentified { display_name, .. } => Some(ConsoleLine::new(
                Severity::Info,
                format!("client identified as {display_name}"),
            )),
            GatewayEvent::StatusChanged { summary, .. } => {
                if self.status.as_deref() == Some(summary.as_str()) {
                    return None;
                }
                self.status = Some(summary.clone());
                Some(ConsoleLine::new(Severity::Info, summary.clone()))
            }
            GatewayEvent::LogLine {
                source,
                severity,
                message,
                ..
            } => Some(ConsoleLine::new(*severity, format!("[{source}] {message}"))),
            GatewayEvent::ExecuteCompleted { outcome, .. } => Some(render_outcome(outcome)),
        }
    }
}

fn render_outcome(outcome: &ExecutionOutcome) -> ConsoleLine {
    match outcome {
        ExecutionOutcome::NoClients => {
            ConsoleLine::new(Severity::Warn, "execute skipped: no clients connected")
        }
        ExecutionOutcome::Dispatched(report) if report.failures.is_empty() => ConsoleLine::new(
            Severity::Info,
            format!("script sent to {} client(s)", report.succeeded),
        ),
        ExecutionOutcome::Dispatched(report) => ConsoleLine::new(
            Severity::Warn,
            format!(
                "script sent to {} client(s), failed for {}: {}",
                report.succeeded,
                report.failed(),
                report.failed_clients().join(", ")
            ),
        ),
    }
}

/// Drains `rx` until the bus closes, logging every rendered line.
pub async fn run(mut rx: broadcast::Receiver<GatewayEvent>) {
    let mut presenter = ConsolePresenter::new();
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let Some(line) = presenter.apply(&event) {
                    emit(&line);
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(lagged = n, "console presenter lagged behind event bus");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn emit(line: &ConsoleLine) {
    match line.severity {
        Severity::Print | Severity::Info => tracing::info!(target: "console", "{}", line.text),
        Severity::Warn => tracing::warn!(target: "console", "{}", line.text),
        Severity::Error => tracing::error!(target: "console", "{}", line.text),
    }
}
