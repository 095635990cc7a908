use frontdesk_store::{ChatMessage, MessageKind, Sender};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OpenSessionRequest {
    pub session_id: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageView {
    pub id: i64,
    pub sender: String,
    pub text: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OpenSessionResponse {
    pub session_id: String,
    pub online: bool,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MessagesQuery {
    pub session_id: String,
    /// Return messages with id strictly greater than this (default 0).
    pub after: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessagesResponse {
    pub session_id: String,
    pub messages: Vec<MessageView>,
    pub online: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendRequest {
    pub session_id: Option<String>,
    pub message: String,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendResponse {
    pub message: String,
    pub entry: MessageView,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autopilot_entry: Option<MessageView>,
}

impl MessageView {
    pub fn from_message(message: &ChatMessage) -> Self {
        Self {
            id: message.id,
            sender: sender_label(message.sender).to_owned(),
            text: message.text.clone(),
            timestamp: message.timestamp.to_rfc3339(),
            kind: kind_label(message.kind).to_owned(),
        }
    }
}

pub fn sender_label(sender: Sender) -> &'static str {
    match sender {
        Sender::Visitor => "visitor",
        Sender::Admin => "admin",
        Sender::Autopilot => "autopilot",
    }
}

pub fn kind_label(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Message => "message",
        MessageKind::Invite => "invite",
        MessageKind::Autopilot => "autopilot",
    }
}
