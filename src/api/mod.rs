//! Control API layer: route handlers, DTOs, cooldown, and router composition.
//!
//! Resource endpoints are mounted under `/api/v1`; `/health` and the
//! `/events` stream live at the root.

pub mod cooldown;
pub mod dto;
pub mod handlers;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI description of the control API.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "exec-gateway control API",
        description = "Operator surface for listing clients and broadcasting scripts."
    ),
    paths(
        handlers::system::health_handler,
        handlers::clients::list_clients,
        handlers::execute::execute_script,
    ),
    tags(
        (name = "System", description = "Service health"),
        (name = "Clients", description = "Attached client connections"),
        (name = "Execute", description = "Script broadcast"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
        .merge(handlers::events::routes())
}

/// Builds the served application: router, docs, and HTTP layers.
pub fn build_app(state: AppState) -> Router {
    let router = build_router();

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
