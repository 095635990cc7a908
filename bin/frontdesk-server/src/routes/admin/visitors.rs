//! Admin visitor-history view.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use chrono::Utc;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::admin::{AdminVisitorsResponse, VisitView, VisitorView};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(list_visitors, forget_visitor),
    components(schemas(AdminVisitorsResponse, VisitorView, VisitView))
)]
pub struct VisitorsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/visitors", get(list_visitors))
        .route("/visitors/{ip}", delete(forget_visitor))
}

/// Merged lifetime + live visitor view.
///
/// Only records that ever touched the index page appear — visitors that
/// never reached the homepage are noise (bots, partial loads) and stay
/// hidden.  Each entry carries its `banned` flag.
#[utoipa::path(
    get,
    path = "/admin/visitors",
    tag = "admin",
    responses(
        (status = 200, description = "Visitor history", body = AdminVisitorsResponse),
        (status = 401, description = "Missing or invalid admin token"),
    )
)]
pub async fn list_visitors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AdminVisitorsResponse>, ServerError> {
    let now = Utc::now();
    for ended in state.presence.sweep(now) {
        state.visitors.finalize(&ended);
    }
    let visitors = state
        .visitors
        .snapshot(true)
        .iter()
        .filter(|record| record.visited_index || record.current_visit.is_some())
        .map(|record| VisitorView::from_record(record, state.bans.is_banned(&record.ip)))
        .collect();
    Ok(Json(AdminVisitorsResponse {
        visitors,
        generated_at: now.to_rfc3339(),
    }))
}

/// Delete one visitor record (the only deletion path).
#[utoipa::path(
    delete,
    path = "/admin/visitors/{ip}",
    tag = "admin",
    responses(
        (status = 200, description = "Record deleted", body = serde_json::Value),
        (status = 404, description = "No record for that IP"),
    )
)]
pub async fn forget_visitor(
    State(state): State<Arc<AppState>>,
    Path(ip): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    state.visitors.forget(&ip)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
