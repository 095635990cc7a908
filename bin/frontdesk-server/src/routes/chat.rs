//! Visitor-facing chat endpoints.
//!
//! Polling-based: the widget re-calls `GET /chat/messages` on an
//! interval with the last message id it has seen.  Sends are gated by
//! the global online toggle — 503 while the business is offline, and in
//! that case no session is created either.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use utoipa::OpenApi;

use frontdesk_store::{MessageKind, ReadRole, Sender};

use crate::error::ServerError;
use crate::middleware::ClientIp;
use crate::schemas::chat::{
    MessageView, MessagesQuery, MessagesResponse, OpenSessionRequest, OpenSessionResponse,
    SendRequest, SendResponse,
};
use crate::state::AppState;

/// How many trailing messages a freshly-opened widget receives.
const SESSION_TAIL: usize = 50;

#[derive(OpenApi)]
#[openapi(
    paths(open_session, poll_messages, send_message),
    components(schemas(
        OpenSessionRequest,
        OpenSessionResponse,
        MessagesResponse,
        SendRequest,
        SendResponse,
        MessageView
    ))
)]
pub struct ChatApi;

/// Register visitor chat routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat/session", post(open_session))
        .route("/chat/messages", get(poll_messages))
        .route("/chat/send", post(send_message))
}

fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

/// Open (or refresh) the visitor's chat session.
#[utoipa::path(
    post,
    path = "/chat/session",
    tag = "chat",
    request_body = OpenSessionRequest,
    responses(
        (status = 200, description = "Session ready", body = OpenSessionResponse),
    )
)]
pub async fn open_session(
    State(state): State<Arc<AppState>>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    headers: HeaderMap,
    Json(req): Json<OpenSessionRequest>,
) -> Result<Json<OpenSessionResponse>, ServerError> {
    let location = state.geo.resolve(&ip).await;
    let (session_id, session) = state.chat.ensure_session(
        req.session_id.as_deref(),
        req.page.as_deref().unwrap_or("/"),
        &ip,
        &location,
        &user_agent(&headers),
        Utc::now(),
    );
    Ok(Json(OpenSessionResponse {
        session_id,
        online: state.chat.is_online(),
        messages: session
            .tail(SESSION_TAIL)
            .iter()
            .map(MessageView::from_message)
            .collect(),
    }))
}

/// Poll for new messages; advances the visitor read watermark.
#[utoipa::path(
    get,
    path = "/chat/messages",
    tag = "chat",
    params(
        ("session_id" = String, Query, description = "Chat session id"),
        ("after" = Option<i64>, Query, description = "Last message id already seen"),
    ),
    responses(
        (status = 200, description = "New messages", body = MessagesResponse),
        (status = 404, description = "Unknown session"),
    )
)]
pub async fn poll_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessagesResponse>, ServerError> {
    if query.session_id.trim().is_empty() {
        return Err(ServerError::BadRequest("session_id is required".into()));
    }
    let messages = state
        .chat
        .messages_since(&query.session_id, query.after.unwrap_or(0))?;
    if let Some(last) = messages.last() {
        state
            .chat
            .mark_read(&query.session_id, ReadRole::Visitor, last.id)?;
    }
    Ok(Json(MessagesResponse {
        session_id: query.session_id.clone(),
        messages: messages.iter().map(MessageView::from_message).collect(),
        online: state.chat.is_online(),
    }))
}

/// Visitor sends a message; the autopilot may append a reply.
#[utoipa::path(
    post,
    path = "/chat/send",
    tag = "chat",
    request_body = SendRequest,
    responses(
        (status = 200, description = "Message stored", body = SendResponse),
        (status = 400, description = "Empty message"),
        (status = 503, description = "Chat is offline"),
    )
)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    headers: HeaderMap,
    Json(req): Json<SendRequest>,
) -> Result<Json<SendResponse>, ServerError> {
    // Gate before ensure_session so an offline business accumulates no
    // empty sessions from probing clients.
    if !state.chat.is_online() {
        return Err(ServerError::ChatOffline);
    }
    if req.message.trim().is_empty() {
        return Err(ServerError::BadRequest("message text is empty".into()));
    }

    let location = state.geo.resolve(&ip).await;
    let (session_id, _) = state.chat.ensure_session(
        req.session_id.as_deref(),
        req.page.as_deref().unwrap_or("/"),
        &ip,
        &location,
        &user_agent(&headers),
        Utc::now(),
    );
    let entry = state.chat.append_message(
        &session_id,
        Sender::Visitor,
        &req.message,
        MessageKind::Message,
        Utc::now(),
    )?;

    // Best-effort autopilot reply; silence is a normal outcome.
    let autopilot_entry = match state.chat.get_session(&session_id) {
        Some(session) => match state.autopilot.reply(&session.messages).await {
            Some(text) => Some(state.chat.append_message(
                &session_id,
                Sender::Autopilot,
                &text,
                MessageKind::Autopilot,
                Utc::now(),
            )?),
            None => None,
        },
        None => None,
    };

    Ok(Json(SendResponse {
        message: "sent".to_owned(),
        entry: MessageView::from_message(&entry),
        session_id,
        autopilot_entry: autopilot_entry.as_ref().map(MessageView::from_message),
    }))
}
