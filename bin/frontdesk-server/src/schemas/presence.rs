use frontdesk_store::ActiveVisit;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PresenceRequest {
    /// Page the client is currently on; defaults to `/`.
    pub page: Option<String>,
    /// `"offline"` finalizes the visit immediately; anything else (or
    /// absent) is a keep-alive ping.
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActiveVisitorView {
    pub ip: String,
    pub first_seen: String,
    pub last_seen: String,
    pub duration_seconds: i64,
    pub location: String,
    pub user_agent: String,
    pub pages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PresenceListResponse {
    pub visitors: Vec<ActiveVisitorView>,
    pub generated_at: String,
}

impl ActiveVisitorView {
    pub fn from_visit(visit: &ActiveVisit) -> Self {
        Self {
            ip: visit.ip.clone(),
            first_seen: visit.first_seen.to_rfc3339(),
            last_seen: visit.last_seen.to_rfc3339(),
            duration_seconds: visit.duration_seconds(),
            location: visit.location.clone(),
            user_agent: visit.user_agent.clone(),
            pages: visit.pages.iter().cloned().collect(),
        }
    }
}
