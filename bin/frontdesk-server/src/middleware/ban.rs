//! Client-IP resolution and the global banned-IP filter.
//!
//! Runs on every request: resolves the caller's IP (forwarded headers
//! first — the server sits behind a tunnel/proxy in its normal
//! deployment — then the socket peer), rejects banned IPs with 403
//! regardless of endpoint, and stashes the IP in request extensions so
//! handlers can read it via `Extension<ClientIp>`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::state::AppState;

/// The resolved client IP, available to every handler.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

pub async fn ban_filter(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let ip = resolve_client_ip(req.headers(), req.extensions().get::<ConnectInfo<SocketAddr>>());
    if state.bans.is_banned(&ip) {
        warn!(%ip, path = req.uri().path(), "rejected request from banned IP");
        return (
            StatusCode::FORBIDDEN,
            axum::Json(serde_json::json!({ "error": "forbidden" })),
        )
            .into_response();
    }
    req.extensions_mut().insert(ClientIp(ip));
    next.run(req).await
}

/// `X-Forwarded-For` first hop, then `X-Real-IP`, then the socket peer.
fn resolve_client_ip(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_owned();
            }
        }
    }
    if let Some(real) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real = real.trim();
        if !real.is_empty() {
            return real.to_owned();
        }
    }
    peer.map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_header_wins_and_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "1.2.3.4, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "5.6.7.8".parse().unwrap());
        assert_eq!(resolve_client_ip(&headers, None), "1.2.3.4");
    }

    #[test]
    fn falls_back_to_real_ip_then_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "5.6.7.8".parse().unwrap());
        assert_eq!(resolve_client_ip(&headers, None), "5.6.7.8");

        let peer = ConnectInfo("9.9.9.9:4242".parse::<SocketAddr>().unwrap());
        assert_eq!(resolve_client_ip(&HeaderMap::new(), Some(&peer)), "9.9.9.9");
        assert_eq!(resolve_client_ip(&HeaderMap::new(), None), "unknown");
    }
}
