//! Client listing handler.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{ClientDto, ClientListResponse};
use crate::app_state::AppState;

/// `GET /clients` — List attached clients.
#[utoipa::path(
    get,
    path = "/api/v1/clients",
    tag = "Clients",
    summary = "List attached clients",
    description = "Returns every registered connection in connection order, with the current status line.",
    responses(
        (status = 200, description = "Attached clients", body = ClientListResponse),
    )
)]
pub async fn list_clients(State(state): State<AppState>) -> impl IntoResponse {
    let clients: Vec<ClientDto> = state
        .registry
        .summaries()
        .await
        .into_iter()
        .map(ClientDto::from)
        .collect();

    Json(ClientListResponse {
        status: state.registry.status_summary().await,
        count: clients.len(),
        clients,
    })
}

/// Client routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/clients", get(list_clients))
}
