//! Visitor presence endpoints.
//!
//! `POST /presence` is the client keep-alive; every call runs the
//! opportunistic timeout sweep first, so no background timer is needed.
//! Handoff discipline: expired / offline visits are popped from the
//! presence tracker (its lock released) before the visitor log is
//! touched — the two locks are never held together.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::middleware::ClientIp;
use crate::schemas::presence::{ActiveVisitorView, PresenceListResponse, PresenceRequest};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(post_presence, get_presence),
    components(schemas(PresenceRequest, PresenceListResponse, ActiveVisitorView))
)]
pub struct PresenceApi;

/// Register presence routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/presence", post(post_presence).get(get_presence))
}

fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

/// Keep-alive ping (or explicit offline signal).
#[utoipa::path(
    post,
    path = "/presence",
    tag = "presence",
    request_body = PresenceRequest,
    responses(
        (status = 200, description = "Ping recorded", body = serde_json::Value),
        (status = 403, description = "Banned IP"),
    )
)]
pub async fn post_presence(
    State(state): State<Arc<AppState>>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    headers: HeaderMap,
    Json(req): Json<PresenceRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let now = Utc::now();
    for ended in state.presence.sweep(now) {
        state.visitors.finalize(&ended);
    }

    if req.status.as_deref() == Some("offline") {
        if let Some(ended) = state.presence.go_offline(&ip) {
            state.visitors.finalize(&ended);
        }
        return Ok(Json(serde_json::json!({ "status": "ok" })));
    }

    let location = state.geo.resolve(&ip).await;
    let page = req.page.as_deref().unwrap_or("/");
    let visit = state
        .presence
        .ping(&ip, page, &location, &user_agent(&headers), now);
    if state.visitors.counts_as_real(&visit) {
        state.visitors.record_progress(&visit);
    }
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// Currently active visitors.
#[utoipa::path(
    get,
    path = "/presence",
    tag = "presence",
    responses(
        (status = 200, description = "Active visitors", body = PresenceListResponse),
    )
)]
pub async fn get_presence(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PresenceListResponse>, ServerError> {
    let now = Utc::now();
    for ended in state.presence.sweep(now) {
        state.visitors.finalize(&ended);
    }
    let visitors = state
        .presence
        .list_active()
        .iter()
        .map(ActiveVisitorView::from_visit)
        .collect();
    Ok(Json(PresenceListResponse {
        visitors,
        generated_at: now.to_rfc3339(),
    }))
}
