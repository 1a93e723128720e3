//! Result of one broadcast of the execute command.

use serde::Serialize;

use super::ClientId;
use crate::error::SendError;

/// A client the execute command could not be handed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendFailure {
    /// Connection identity.
    pub client_id: ClientId,
    /// Display name at the time of the send.
    pub display_name: String,
    /// Why the send failed.
    pub reason: SendError,
}

/// Per-client tally of a dispatched execute command.
///
/// Partial success is normal: every client in the snapshot is attempted
/// regardless of earlier failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Number of clients whose queue accepted the command.
    pub succeeded: usize,
    /// Clients whose send failed, in registry order.
    pub failures: Vec<SendFailure>,
}

impl DispatchReport {
    /// Number of failed sends.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Display names of the clients that failed.
    #[must_use]
    pub fn failed_clients(&self) -> Vec<&str> {
        self.failures
            .iter()
            .map(|f| f.display_name.as_str())
            .collect()
    }
}

/// Outcome of [`crate::service::ExecuteService::execute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The registry was empty; nothing was sent.
    NoClients,
    /// The command was handed to every client in the snapshot.
    Dispatched(DispatchReport),
}

impl ExecutionOutcome {
    /// Number of successful sends (zero when there were no clients).
    #[must_use]
    pub fn succeeded(&self) -> usize {
        match self {
            Self::NoClients => 0,
            Self::Dispatched(report) => report.succeeded,
        }
    }

    /// Number of failed sends (zero when there were no clients).
    #[must_use]
    pub fn failed(&self) -> usize {
        match self {
            Self::NoClients => 0,
            Self::Dispatched(report) => report.failed(),
        }
    }
}
