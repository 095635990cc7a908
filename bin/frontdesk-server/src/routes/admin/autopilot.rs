//! Autopilot settings management.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use frontdesk_store::AutopilotSettings;

use crate::error::ServerError;
use crate::schemas::admin::{AutopilotSettingsView, AutopilotUpdateRequest};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(get_settings, update_settings),
    components(schemas(AutopilotSettingsView, AutopilotUpdateRequest))
)]
pub struct AutopilotApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/autopilot", get(get_settings).put(update_settings))
}

/// Current settings, API key redacted.
#[utoipa::path(
    get,
    path = "/admin/autopilot",
    tag = "admin",
    responses(
        (status = 200, description = "Current settings", body = AutopilotSettingsView),
    )
)]
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AutopilotSettingsView>, ServerError> {
    Ok(Json(AutopilotSettingsView::from_settings(
        &state.autopilot.settings(),
    )))
}

/// Replace the settings; an absent or empty `api_key` keeps the stored one.
#[utoipa::path(
    put,
    path = "/admin/autopilot",
    tag = "admin",
    request_body = AutopilotUpdateRequest,
    responses(
        (status = 200, description = "Settings updated", body = AutopilotSettingsView),
    )
)]
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AutopilotUpdateRequest>,
) -> Result<Json<AutopilotSettingsView>, ServerError> {
    let current = state.autopilot.settings();
    let updated = AutopilotSettings {
        enabled: req.enabled,
        provider: req.provider.unwrap_or(current.provider),
        base_url: req.base_url.unwrap_or(current.base_url),
        model: req.model.unwrap_or(current.model),
        temperature: req.temperature.unwrap_or(current.temperature),
        api_key: match req.api_key {
            Some(key) if !key.trim().is_empty() => key,
            _ => current.api_key,
        },
        business_profile: req.business_profile.unwrap_or(current.business_profile),
        website_knowledge: req.website_knowledge.unwrap_or(current.website_knowledge),
    };
    state.autopilot.update_settings(updated);
    Ok(Json(AutopilotSettingsView::from_settings(
        &state.autopilot.settings(),
    )))
}
