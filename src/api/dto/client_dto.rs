//! Client listing DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::ClientSummary;

/// One attached client.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClientDto {
    /// Connection identifier.
    pub client_id: uuid::Uuid,
    /// Current display name.
    pub display_name: String,
    /// When the connection was registered.
    pub connected_at: DateTime<Utc>,
}

impl From<ClientSummary> for ClientDto {
    fn from(summary: ClientSummary) -> Self {
        Self {
            client_id: summary.client_id.into(),
            display_name: summary.display_name,
            connected_at: summary.connected_at,
        }
    }
}

/// Response body for `GET /api/v1/clients`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClientListResponse {
    /// Human-readable status line.
    pub status: String,
    /// Number of attached clients.
    pub count: usize,
    /// Attached clients in connection order.
    pub clients: Vec<ClientDto>,
}
