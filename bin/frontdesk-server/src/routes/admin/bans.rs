//! Banned-IP management.  The actual enforcement lives in the global
//! ban middleware; these routes only edit the list.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::admin::{BanListResponse, BanRequest};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(list_bans, ban_ip, unban_ip),
    components(schemas(BanRequest, BanListResponse))
)]
pub struct BansApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bans", get(list_bans).post(ban_ip))
        .route("/bans/{ip}", delete(unban_ip))
}

#[utoipa::path(
    get,
    path = "/admin/bans",
    tag = "admin",
    responses(
        (status = 200, description = "Banned IPs", body = BanListResponse),
    )
)]
pub async fn list_bans(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BanListResponse>, ServerError> {
    Ok(Json(BanListResponse {
        banned: state.bans.list(),
    }))
}

#[utoipa::path(
    post,
    path = "/admin/bans",
    tag = "admin",
    request_body = BanRequest,
    responses(
        (status = 200, description = "IP banned", body = serde_json::Value),
        (status = 400, description = "Empty IP"),
    )
)]
pub async fn ban_ip(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BanRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let ip = req.ip.trim();
    if ip.is_empty() {
        return Err(ServerError::BadRequest("ip is required".into()));
    }
    let added = state.bans.ban(ip);
    Ok(Json(serde_json::json!({ "banned": true, "added": added })))
}

#[utoipa::path(
    delete,
    path = "/admin/bans/{ip}",
    tag = "admin",
    responses(
        (status = 200, description = "IP unbanned", body = serde_json::Value),
        (status = 404, description = "IP was not banned"),
    )
)]
pub async fn unban_ip(
    State(state): State<Arc<AppState>>,
    Path(ip): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    if !state.bans.unban(&ip) {
        return Err(ServerError::NotFound(format!("{ip} is not banned")));
    }
    Ok(Json(serde_json::json!({ "banned": false })))
}
