pub mod autopilot;
pub mod bans;
pub mod chat;
pub mod visitors;

use std::sync::Arc;

use axum::{Router, middleware};
use utoipa::OpenApi;

use crate::middleware::auth;
use crate::state::AppState;

// Routes nested under `/admin` (visitors, chat inbox, autopilot, bans).
pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .merge(visitors::router())
        .merge(chat::router())
        .merge(autopilot::router())
        .merge(bans::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::admin_auth,
        ))
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi()]
pub struct AdminApi;

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut spec = AdminApi::openapi();
    spec.merge(visitors::VisitorsApi::openapi());
    spec.merge(chat::AdminChatApi::openapi());
    spec.merge(autopilot::AutopilotApi::openapi());
    spec.merge(bans::BansApi::openapi());
    spec
}
