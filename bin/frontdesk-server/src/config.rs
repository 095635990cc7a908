//! Server configuration, loaded from environment variables at startup.

use std::collections::BTreeSet;

use frontdesk_store::normalize_page;

/// Runtime configuration for frontdesk-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// Directory holding the JSON documents (visitor log, chat state,
    /// ban list, autopilot settings).  Created on first write.
    pub data_dir: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated CORS origin allow-list; `None` means wildcard.
    pub cors_allowed_origins: Option<String>,

    /// Bearer token protecting `/admin`.  `None` disables the check
    /// (local development only).
    pub admin_token: Option<String>,

    /// Inactivity window in seconds after which an active visitor is
    /// swept and their visit finalized (default: 180).
    pub visitor_timeout_secs: i64,

    /// Normalized page paths that make a visit count as real
    /// (default: just `/`).
    pub index_pages: BTreeSet<String>,

    /// Geolocation lookup base URL; the IP is appended as a path segment.
    pub geo_endpoint: String,

    /// Serve Swagger UI at `/swagger-ui` (disable in production).
    pub enable_swagger: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("FRONTDESK_BIND", "0.0.0.0:3000"),
            data_dir: env_or("FRONTDESK_DATA_DIR", "./data"),
            log_level: env_or("FRONTDESK_LOG", "info"),
            log_json: std::env::var("FRONTDESK_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            cors_allowed_origins: std::env::var("FRONTDESK_CORS_ORIGINS").ok(),
            admin_token: std::env::var("FRONTDESK_ADMIN_TOKEN").ok(),
            visitor_timeout_secs: parse_env("FRONTDESK_VISITOR_TIMEOUT", 180),
            index_pages: parse_index_pages(&env_or("FRONTDESK_INDEX_PAGES", "/")),
            geo_endpoint: env_or("FRONTDESK_GEO_ENDPOINT", "http://ip-api.com/json"),
            enable_swagger: std::env::var("FRONTDESK_ENABLE_SWAGGER")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_index_pages(raw: &str) -> BTreeSet<String> {
    let pages: BTreeSet<String> = raw
        .split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(normalize_page)
        .collect();
    if pages.is_empty() {
        BTreeSet::from(["/".to_owned()])
    } else {
        pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_pages_are_normalized() {
        let pages = parse_index_pages("/, index.html , /home?src=nav");
        assert!(pages.contains("/"));
        assert!(pages.contains("/index.html"));
        assert!(pages.contains("/home"));
    }

    #[test]
    fn empty_index_page_list_falls_back_to_root() {
        let pages = parse_index_pages("  , ");
        assert_eq!(pages.iter().collect::<Vec<_>>(), ["/"]);
    }
}
