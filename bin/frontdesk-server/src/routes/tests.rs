use std::collections::BTreeSet;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::config::Config;
use crate::routes;
use crate::state::AppState;

// Private client IPs keep the geolocation resolver fully offline.
const VISITOR_IP: &str = "192.168.0.9";

fn test_state(dir: &tempfile::TempDir, admin_token: Option<&str>) -> Arc<AppState> {
    Arc::new(AppState::new(Config {
        bind_address: "127.0.0.1:0".to_owned(),
        data_dir: dir.path().to_string_lossy().into_owned(),
        log_level: "info".to_owned(),
        log_json: false,
        cors_allowed_origins: None,
        admin_token: admin_token.map(str::to_owned),
        visitor_timeout_secs: 180,
        index_pages: BTreeSet::from(["/".to_owned()]),
        // Unreachable on purpose; lookups degrade to the unknown label.
        geo_endpoint: "http://127.0.0.1:9/json".to_owned(),
        enable_swagger: false,
    }))
}

fn post(uri: &str, ip: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, ip: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn ping_then_list_shows_the_active_visitor() {
    let dir = tempfile::tempdir().unwrap();
    let app = routes::build(test_state(&dir, None));

    let (status, _) = send(&app, post("/presence", VISITOR_IP, json!({ "page": "/" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get("/presence", VISITOR_IP)).await;
    assert_eq!(status, StatusCode::OK);
    let visitors = body["visitors"].as_array().unwrap();
    assert_eq!(visitors.len(), 1);
    assert_eq!(visitors[0]["ip"], VISITOR_IP);
    assert_eq!(visitors[0]["location"], "Local network");
}

#[tokio::test]
async fn offline_finalizes_the_visit_into_admin_history() {
    let dir = tempfile::tempdir().unwrap();
    let app = routes::build(test_state(&dir, None));

    send(&app, post("/presence", VISITOR_IP, json!({ "page": "/" }))).await;
    send(
        &app,
        post("/presence", VISITOR_IP, json!({ "status": "offline" })),
    )
    .await;

    let (status, body) = send(&app, get("/admin/visitors", "192.168.0.100")).await;
    assert_eq!(status, StatusCode::OK);
    let visitors = body["visitors"].as_array().unwrap();
    assert_eq!(visitors.len(), 1);
    assert_eq!(visitors[0]["ip"], VISITOR_IP);
    assert_eq!(visitors[0]["visit_count"], 1);
    assert_eq!(visitors[0]["visited_index"], true);
    assert_eq!(visitors[0]["visits"][0]["pages"], json!(["/"]));
    // Active list is empty again.
    let (_, body) = send(&app, get("/presence", "192.168.0.100")).await;
    assert!(body["visitors"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn visit_that_never_reaches_the_index_page_stays_hidden() {
    let dir = tempfile::tempdir().unwrap();
    let app = routes::build(test_state(&dir, None));

    send(
        &app,
        post("/presence", VISITOR_IP, json!({ "page": "/style.css" })),
    )
    .await;
    send(
        &app,
        post("/presence", VISITOR_IP, json!({ "status": "offline" })),
    )
    .await;

    let (_, body) = send(&app, get("/admin/visitors", "192.168.0.100")).await;
    assert!(body["visitors"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn chat_round_trip_between_visitor_and_admin() {
    let dir = tempfile::tempdir().unwrap();
    let app = routes::build(test_state(&dir, None));

    let (status, body) = send(
        &app,
        post("/chat/send", VISITOR_IP, json!({ "message": "hello", "page": "/" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let session_id = body["session_id"].as_str().unwrap().to_owned();
    assert_eq!(body["entry"]["id"], 1);
    assert_eq!(body["entry"]["sender"], "visitor");
    // Autopilot is unconfigured, so no reply rides along.
    assert!(body.get("autopilot_entry").is_none());

    // Admin sees the session with one unread message.
    let (_, body) = send(&app, get("/admin/chat/sessions", "192.168.0.100")).await;
    let sessions = body["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["unread"], 1);

    // Admin reads and replies.
    let uri = format!("/admin/chat/messages?session_id={session_id}&after=0");
    let (_, body) = send(&app, get(&uri, "192.168.0.100")).await;
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    let (status, _) = send(
        &app,
        post(
            "/admin/chat/send",
            "192.168.0.100",
            json!({ "session_id": session_id, "message": "hi, how can I help?" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Unread count is back to zero after the admin poll.
    let (_, body) = send(&app, get("/admin/chat/sessions", "192.168.0.100")).await;
    assert_eq!(body["sessions"][0]["unread"], 0);

    // Visitor polls for the reply.
    let uri = format!("/chat/messages?session_id={session_id}&after=1");
    let (_, body) = send(&app, get(&uri, VISITOR_IP)).await;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["id"], 2);
    assert_eq!(messages[0]["sender"], "admin");
}

#[tokio::test]
async fn send_while_offline_is_rejected_without_creating_a_session() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir, None);
    let app = routes::build(state.clone());

    send(
        &app,
        post("/admin/chat/status", "192.168.0.100", json!({ "online": false })),
    )
    .await;

    let (status, _) = send(
        &app,
        post("/chat/send", VISITOR_IP, json!({ "session_id": "", "message": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(state.chat.list_sessions().is_empty());
}

#[tokio::test]
async fn whitespace_only_message_is_a_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = routes::build(test_state(&dir, None));
    let (status, _) = send(
        &app,
        post("/chat/send", VISITOR_IP, json!({ "message": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn banned_ip_gets_403_on_every_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = routes::build(test_state(&dir, None));

    send(
        &app,
        post("/admin/bans", "192.168.0.100", json!({ "ip": VISITOR_IP })),
    )
    .await;

    for request in [
        get("/health", VISITOR_IP),
        post("/presence", VISITOR_IP, json!({ "page": "/" })),
        post("/chat/send", VISITOR_IP, json!({ "message": "hi" })),
    ] {
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    // Other IPs are unaffected.
    let (status, _) = send(&app, get("/health", "192.168.0.100")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_routes_require_the_configured_token() {
    let dir = tempfile::tempdir().unwrap();
    let app = routes::build(test_state(&dir, Some("secret-token")));

    let (status, _) = send(&app, get("/admin/visitors", "192.168.0.100")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let authed = Request::builder()
        .uri("/admin/visitors")
        .header("x-forwarded-for", "192.168.0.100")
        .header(header::AUTHORIZATION, "Bearer secret-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, authed).await;
    assert_eq!(status, StatusCode::OK);

    // Public routes stay open.
    let (status, _) = send(&app, get("/health", VISITOR_IP)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn autopilot_settings_update_redacts_the_api_key() {
    let dir = tempfile::tempdir().unwrap();
    let app = routes::build(test_state(&dir, None));

    let update = Request::builder()
        .method("PUT")
        .uri("/admin/autopilot")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "192.168.0.100")
        .body(Body::from(
            json!({ "enabled": true, "model": "gpt-4o", "api_key": "sk-test" }).to_string(),
        ))
        .unwrap();
    let (status, body) = send(&app, update).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], true);
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["api_key_set"], true);
    assert!(body.get("api_key").is_none());
}

#[tokio::test]
async fn unknown_session_polls_are_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = routes::build(test_state(&dir, None));
    let (status, _) = send(
        &app,
        get("/chat/messages?session_id=missing&after=0", VISITOR_IP),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
