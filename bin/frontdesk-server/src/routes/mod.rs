//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection, global
//!   banned-IP filter)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with
//!   `FRONTDESK_ENABLE_SWAGGER=false`)
//! - Health / heartbeat route
//! - Visitor-facing presence and chat routes
//! - Admin routes under `/admin` (optionally protected by bearer token)

mod admin;
mod chat;
pub mod doc;
mod health;
mod presence;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{Router, middleware};
use tower::ServiceBuilder;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{ban, cors, trace};
use crate::state::AppState;

// ── Router builder ────────────────────────────────────────────────────────────

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .merge(health::router())
        .merge(presence::router())
        .merge(chat::router())
        .nest("/admin", admin::router(state.clone()));

    let mut app = Router::new().merge(api_router);

    // ── Swagger UI ────────────────────────────────────────────────────────────
    // Enabled by default; disable with FRONTDESK_ENABLE_SWAGGER=false in
    // production to avoid exposing the API structure to potential attackers.
    let api_doc = doc::get_docs();

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api_doc));
    }

    app
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(state.clone())))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            trace::trace_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            ban::ban_filter,
        ))
        .with_state(state)
}
