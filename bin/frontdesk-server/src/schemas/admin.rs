use frontdesk_store::{AutopilotSettings, ChatSession, VisitSession, VisitorRecord};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::chat::MessageView;

// ── Visitor history ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VisitView {
    pub first_seen: String,
    pub last_seen: String,
    pub duration_seconds: i64,
    pub pages: Vec<String>,
    pub location: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VisitorView {
    pub ip: String,
    pub first_seen: String,
    pub last_seen: String,
    pub location: String,
    pub user_agent: String,
    pub pages: Vec<String>,
    pub visit_count: usize,
    pub total_duration_seconds: i64,
    pub visited_index: bool,
    pub banned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_visit: Option<VisitView>,
    pub visits: Vec<VisitView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminVisitorsResponse {
    pub visitors: Vec<VisitorView>,
    pub generated_at: String,
}

impl VisitView {
    pub fn from_session(session: &VisitSession) -> Self {
        Self {
            first_seen: session.first_seen.to_rfc3339(),
            last_seen: session.last_seen.to_rfc3339(),
            duration_seconds: session.duration_seconds,
            pages: session.pages.iter().cloned().collect(),
            location: session.location.clone(),
            user_agent: session.user_agent.clone(),
        }
    }
}

impl VisitorView {
    pub fn from_record(record: &VisitorRecord, banned: bool) -> Self {
        Self {
            ip: record.ip.clone(),
            first_seen: record.first_seen.to_rfc3339(),
            last_seen: record.last_seen.to_rfc3339(),
            location: record.location.clone(),
            user_agent: record.user_agent.clone(),
            pages: record.pages.iter().cloned().collect(),
            visit_count: record.visit_count,
            total_duration_seconds: record.total_duration_seconds,
            visited_index: record.visited_index,
            banned,
            current_visit: record.current_visit.as_ref().map(VisitView::from_session),
            visits: record.visits.iter().map(VisitView::from_session).collect(),
        }
    }
}

// ── Chat inbox ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionVisitorView {
    pub ip: String,
    pub location: String,
    pub user_agent: String,
    pub last_page: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionSummaryView {
    pub session_id: String,
    pub created_at: String,
    pub last_seen: String,
    pub visitor: SessionVisitorView,
    pub message_count: usize,
    pub unread: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<MessageView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummaryView>,
    pub online: bool,
}

impl SessionSummaryView {
    pub fn from_session(session: &ChatSession) -> Self {
        Self {
            session_id: session.session_id.clone(),
            created_at: session.created_at.to_rfc3339(),
            last_seen: session.last_seen.to_rfc3339(),
            visitor: SessionVisitorView {
                ip: session.visitor.ip.clone(),
                location: session.visitor.location.clone(),
                user_agent: session.visitor.user_agent.clone(),
                last_page: session.visitor.last_page.clone(),
            },
            message_count: session.messages.len(),
            unread: session.unread_for_admin(),
            last_message: session.messages.last().map(MessageView::from_message),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminSendRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InviteRequest {
    pub session_id: String,
    /// Custom invite text; a stock greeting is used when absent.
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatStatusResponse {
    pub online: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetChatStatusRequest {
    pub online: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CloseSessionRequest {
    pub session_id: String,
}

// ── Autopilot settings ───────────────────────────────────────────────────────

/// Settings as exposed to the admin UI; the API key itself never leaves
/// the server, only whether one is configured.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AutopilotSettingsView {
    pub enabled: bool,
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub api_key_set: bool,
    pub business_profile: String,
    pub website_knowledge: String,
}

impl AutopilotSettingsView {
    pub fn from_settings(settings: &AutopilotSettings) -> Self {
        Self {
            enabled: settings.enabled,
            provider: settings.provider.clone(),
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            api_key_set: !settings.api_key.is_empty(),
            business_profile: settings.business_profile.clone(),
            website_knowledge: settings.website_knowledge.clone(),
        }
    }
}

/// Full-replace update; an absent/empty `api_key` keeps the stored one.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AutopilotUpdateRequest {
    pub enabled: bool,
    pub provider: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub api_key: Option<String>,
    pub business_profile: Option<String>,
    pub website_knowledge: Option<String>,
}

// ── Bans ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BanRequest {
    pub ip: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BanListResponse {
    pub banned: Vec<String>,
}
