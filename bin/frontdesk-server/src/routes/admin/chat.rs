//! Admin chat inbox: list sessions, read and send messages, invite
//! visitors, toggle the global online gate, close sessions.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use utoipa::OpenApi;

use frontdesk_store::{MessageKind, ReadRole, Sender};

use crate::error::ServerError;
use crate::schemas::admin::{
    AdminSendRequest, ChatStatusResponse, CloseSessionRequest, InviteRequest, SessionListResponse,
    SessionSummaryView, SetChatStatusRequest,
};
use crate::schemas::chat::{MessageView, MessagesQuery, MessagesResponse};
use crate::state::AppState;

const INVITE_GREETING: &str = "Hi there! Let me know if you have any questions.";

#[derive(OpenApi)]
#[openapi(
    paths(
        list_sessions,
        poll_messages,
        send_message,
        invite_visitor,
        get_status,
        set_status,
        close_session
    ),
    components(schemas(
        SessionListResponse,
        SessionSummaryView,
        AdminSendRequest,
        InviteRequest,
        ChatStatusResponse,
        SetChatStatusRequest,
        CloseSessionRequest
    ))
)]
pub struct AdminChatApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat/sessions", get(list_sessions))
        .route("/chat/messages", get(poll_messages))
        .route("/chat/send", post(send_message))
        .route("/chat/invite", post(invite_visitor))
        .route("/chat/status", get(get_status).post(set_status))
        .route("/chat/close", post(close_session))
}

/// Inbox: all sessions with unread counts, most recent first.
#[utoipa::path(
    get,
    path = "/admin/chat/sessions",
    tag = "admin-chat",
    responses(
        (status = 200, description = "Session inbox", body = SessionListResponse),
    )
)]
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionListResponse>, ServerError> {
    let sessions = state
        .chat
        .list_sessions()
        .iter()
        .map(SessionSummaryView::from_session)
        .collect();
    Ok(Json(SessionListResponse {
        sessions,
        online: state.chat.is_online(),
    }))
}

/// Poll one session; advances the admin read watermark.
#[utoipa::path(
    get,
    path = "/admin/chat/messages",
    tag = "admin-chat",
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
            .mark_read(&query.session_id, ReadRole::Admin, last.id)?;
    }
    Ok(Json(MessagesResponse {
        session_id: query.session_id.clone(),
        messages: messages.iter().map(MessageView::from_message).collect(),
        online: state.chat.is_online(),
    }))
}

/// Admin reply into an existing session.
#[utoipa::path(
    post,
    path = "/admin/chat/send",
    tag = "admin-chat",
    request_body = AdminSendRequest,
    responses(
        (status = 200, description = "Message stored", body = MessageView),
        (status = 400, description = "Empty message"),
        (status = 404, description = "Unknown session"),
    )
)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminSendRequest>,
) -> Result<Json<MessageView>, ServerError> {
    let entry = state.chat.append_message(
        &req.session_id,
        Sender::Admin,
        &req.message,
        MessageKind::Message,
        Utc::now(),
    )?;
    Ok(Json(MessageView::from_message(&entry)))
}

/// Proactive invite shown in the visitor's widget.
#[utoipa::path(
    post,
    path = "/admin/chat/invite",
    tag = "admin-chat",
    request_body = InviteRequest,
    responses(
        (status = 200, description = "Invite stored", body = MessageView),
        (status = 404, description = "Unknown session"),
    )
)]
pub async fn invite_visitor(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InviteRequest>,
) -> Result<Json<MessageView>, ServerError> {
    let text = req
        .message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(INVITE_GREETING);
    let entry = state.chat.append_message(
        &req.session_id,
        Sender::Admin,
        text,
        MessageKind::Invite,
        Utc::now(),
    )?;
    Ok(Json(MessageView::from_message(&entry)))
}

/// Read the global online toggle.
#[utoipa::path(
    get,
    path = "/admin/chat/status",
    tag = "admin-chat",
    responses(
        (status = 200, description = "Current status", body = ChatStatusResponse),
    )
)]
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ChatStatusResponse>, ServerError> {
    Ok(Json(ChatStatusResponse {
        online: state.chat.is_online(),
    }))
}

/// Flip the global online toggle (the "nobody is watching" breaker).
#[utoipa::path(
    post,
    path = "/admin/chat/status",
    tag = "admin-chat",
    request_body = SetChatStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ChatStatusResponse),
    )
)]
pub async fn set_status(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetChatStatusRequest>,
) -> Result<Json<ChatStatusResponse>, ServerError> {
    state.chat.set_online(req.online);
    Ok(Json(ChatStatusResponse { online: req.online }))
}

/// Hard-delete a session from the inbox.
#[utoipa::path(
    post,
    path = "/admin/chat/close",
    tag = "admin-chat",
    request_body = CloseSessionRequest,
    responses(
        (status = 200, description = "Session closed", body = serde_json::Value),
        (status = 404, description = "Unknown session"),
    )
)]
pub async fn close_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CloseSessionRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    state.chat.close_session(&req.session_id)?;
    Ok(Json(serde_json::json!({ "closed": true })))
}
