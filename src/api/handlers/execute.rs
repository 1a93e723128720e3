//! Execute endpoint: the operator's entry point into the broadcast.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{ExecuteRequest, ExecuteResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /execute` — Send a script to every attached client.
///
/// # Errors
///
/// Returns [`GatewayError`] on a malformed body, while the cooldown is
/// active, or when the client listener is down.
#[utoipa::path(
    post,
    path = "/api/v1/execute",
    tag = "Execute",
    summary = "Broadcast a script",
    description = "Sends the script to every attached client. Per-client failures are reported in the body and do not fail the request.",
    request_body = ExecuteRequest,
    responses(
        (status = 200, description = "Script dispatched (or no clients attached)", body = ExecuteResponse),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 429, description = "Previous execute still cooling down", body = ErrorResponse),
        (status = 503, description = "Client listener is not running", body = ErrorResponse),
    )
)]
pub async fn execute_script(
    State(state): State<AppState>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(req) = payload.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;

    if !state.execute_service.is_available() {
        return Err(GatewayError::ExecuteUnavailable);
    }
    state
        .cooldown
        .try_begin()
        .map_err(|remaining| GatewayError::RateLimited {
            retry_after_ms: u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
        })?;

    let outcome = state.execute_service.execute(&req.script).await?;
    Ok(Json(ExecuteResponse::from(&outcome)))
}

/// Execute routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/execute", post(execute_script))
}
