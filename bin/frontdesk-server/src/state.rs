//! Shared application state injected into every Axum handler.
//!
//! Each store is constructed exactly once here and handed to handlers by
//! `Arc` — no module-level singletons.

use std::path::Path;
use std::sync::Arc;

use frontdesk_store::{
    AutopilotResponder, BanList, ChatStore, GeoResolver, JsonDocument, PresenceTracker, VisitorLog,
};

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Lifetime per-IP visit history.
    pub visitors: Arc<VisitorLog>,
    /// Currently active visitors (in-memory only).
    pub presence: Arc<PresenceTracker>,
    /// Chat sessions + global online toggle.
    pub chat: Arc<ChatStore>,
    /// Banned IPs, enforced by global middleware.
    pub bans: Arc<BanList>,
    /// LLM autopilot (optional, settings-driven).
    pub autopilot: Arc<AutopilotResponder>,
    /// Best-effort IP geolocation.
    pub geo: Arc<GeoResolver>,
}

impl AppState {
    /// Build all stores from the configured data directory.
    pub fn new(config: Config) -> Self {
        let data = Path::new(&config.data_dir);
        let visitors = VisitorLog::open(
            JsonDocument::new(data.join("visitors.json")),
            config.index_pages.clone(),
        );
        let chat = ChatStore::open(JsonDocument::new(data.join("chat.json")));
        let bans = BanList::open(JsonDocument::new(data.join("bans.json")));
        let autopilot = AutopilotResponder::open(JsonDocument::new(data.join("autopilot.json")));
        let geo = GeoResolver::new(config.geo_endpoint.clone());
        let presence = PresenceTracker::new(config.visitor_timeout_secs);
        Self {
            config: Arc::new(config),
            visitors: Arc::new(visitors),
            presence: Arc::new(presence),
            chat: Arc::new(chat),
            bans: Arc::new(bans),
            autopilot: Arc::new(autopilot),
            geo: Arc::new(geo),
        }
    }
}
