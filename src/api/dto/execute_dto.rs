//! Execute request/response DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{ExecutionOutcome, SendFailure};

/// Request body for `POST /api/v1/execute`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExecuteRequest {
    /// Script text sent verbatim to every client. May be empty.
    pub script: String,
}

/// A client the script could not be sent to.
#[derive(Debug, Serialize, ToSchema)]
pub struct FailedClientDto {
    /// Connection identifier.
    pub client_id: uuid::Uuid,
    /// Display name at the time of the send.
    pub display_name: String,
    /// Failure reason (`closed` or `backpressure`).
    pub reason: String,
}

impl From<&SendFailure> for FailedClientDto {
    fn from(failure: &SendFailure) -> Self {
        Self {
            client_id: failure.client_id.into(),
            display_name: failure.display_name.clone(),
            reason: failure.reason.as_str().to_string(),
        }
    }
}

/// Response body for `POST /api/v1/execute`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ExecuteResponse {
    /// `no_clients` or `dispatched`.
    pub status: String,
    /// Clients the script was queued for.
    pub succeeded: usize,
    /// Clients the send failed for.
    pub failed: usize,
    /// Details of each failure.
    pub failed_clients: Vec<FailedClientDto>,
}

impl From<&ExecutionOutcome> for ExecuteResponse {
    fn from(outcome: &ExecutionOutcome) -> Self {
        match outcome {
            ExecutionOutcome::NoClients => Self {
                status: "no_clients".to_string(),
                succeeded: 0,
                failed: 0,
                failed_clients: Vec::new(),
            },
            ExecutionOutcome::Dispatched(report) => Self {
                status: "dispatched".to_string(),
                succeeded: report.succeeded,
                failed: report.failed(),
                failed_clients: report.failures.iter().map(FailedClientDto::from).collect(),
            },
        }
    }
}
