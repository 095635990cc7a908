//! Chat sessions and message ordering.
//!
//! Sessions are keyed by an opaque id (minted as a UUID when the client
//! supplies none).  Each session carries an append-only message log with
//! ids assigned from a per-session monotonic counter — `append_message`
//! is the only path that advances the counter, and it runs under the
//! store lock, so ids are strictly increasing and never reused even when
//! visitor and admin sends interleave.
//!
//! Separate read watermarks per side (visitor / admin) drive the unread
//! counts on the admin inbox.  A single global `online` toggle gates
//! visitor-initiated sends; the route layer turns "offline" into a 503.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::JsonDocument;
use crate::error::StoreError;
use crate::{clip_user_agent, location_improves, normalize_page, UNKNOWN_LOCATION};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Visitor,
    Admin,
    Autopilot,
}

/// Message flavour.  `Invite` messages are admin nudges shown to the
/// visitor; they are excluded from the autopilot's LLM context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Message,
    Invite,
    Autopilot,
}

/// Which side's read watermark to advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRole {
    Visitor,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatMessage {
    pub id: i64,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

impl Default for ChatMessage {
    fn default() -> Self {
        Self {
            id: 0,
            sender: Sender::Visitor,
            text: String::new(),
            timestamp: DateTime::<Utc>::default(),
            kind: MessageKind::Message,
        }
    }
}

/// Visitor metadata embedded in a session, merged on every contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatVisitor {
    pub ip: String,
    pub location: String,
    pub user_agent: String,
    pub last_page: String,
}

impl Default for ChatVisitor {
    fn default() -> Self {
        Self {
            ip: String::new(),
            location: UNKNOWN_LOCATION.to_owned(),
            user_agent: String::new(),
            last_page: "/".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSession {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub visitor: ChatVisitor,
    pub messages: Vec<ChatMessage>,
    pub next_id: i64,
    pub last_admin_read: i64,
    pub last_visitor_read: i64,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self {
            session_id: String::new(),
            created_at: DateTime::<Utc>::default(),
            last_seen: DateTime::<Utc>::default(),
            visitor: ChatVisitor::default(),
            messages: Vec::new(),
            next_id: 1,
            last_admin_read: 0,
            last_visitor_read: 0,
        }
    }
}

impl ChatSession {
    /// Visitor messages the admin side has not acknowledged yet.
    pub fn unread_for_admin(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.sender == Sender::Visitor && m.id > self.last_admin_read)
            .count()
    }

    /// The last `n` messages, oldest first.
    pub fn tail(&self, n: usize) -> Vec<ChatMessage> {
        let start = self.messages.len().saturating_sub(n);
        self.messages[start..].to_vec()
    }
}

/// The persisted chat document: all sessions plus the global toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ChatDocument {
    online: bool,
    sessions: BTreeMap<String, ChatSession>,
}

impl Default for ChatDocument {
    fn default() -> Self {
        Self {
            online: true,
            sessions: BTreeMap::new(),
        }
    }
}

/// The chat session store.
pub struct ChatStore {
    doc: JsonDocument,
    inner: Mutex<ChatDocument>,
}

impl ChatStore {
    pub fn open(doc: JsonDocument) -> Self {
        let state: ChatDocument = doc.load();
        Self {
            doc,
            inner: Mutex::new(state),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ChatDocument> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn persist(&self) {
        let snapshot = self.lock().clone();
        self.doc.save(&snapshot);
    }

    /// Look up or create a session, refreshing `last_seen` and merging
    /// visitor metadata.  An empty or unknown id mints a fresh UUID.
    /// Returns the effective id plus a snapshot of the session.
    pub fn ensure_session(
        &self,
        session_id: Option<&str>,
        page: &str,
        ip: &str,
        location: &str,
        user_agent: &str,
        now: DateTime<Utc>,
    ) -> (String, ChatSession) {
        let result = {
            let mut state = self.lock();
            let id = match session_id {
                Some(id) if !id.trim().is_empty() && state.sessions.contains_key(id) => {
                    id.to_owned()
                }
                _ => Uuid::new_v4().to_string(),
            };
            let session = state
                .sessions
                .entry(id.clone())
                .or_insert_with(|| ChatSession {
                    session_id: id.clone(),
                    created_at: now,
                    last_seen: now,
                    ..ChatSession::default()
                });
            if now > session.last_seen {
                session.last_seen = now;
            }
            if !ip.is_empty() {
                session.visitor.ip = ip.to_owned();
            }
            if location_improves(location) {
                session.visitor.location = location.to_owned();
            }
            if !user_agent.is_empty() {
                session.visitor.user_agent = clip_user_agent(user_agent);
            }
            if !page.trim().is_empty() {
                session.visitor.last_page = normalize_page(page);
            }
            (id, session.clone())
        };
        self.persist();
        result
    }

    /// Append a message, assigning the next id.  Whitespace-only text is
    /// rejected without advancing the counter.
    pub fn append_message(
        &self,
        session_id: &str,
        sender: Sender,
        text: &str,
        kind: MessageKind,
        now: DateTime<Utc>,
    ) -> Result<ChatMessage, StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::Validation("message text is empty".into()));
        }
        let message = {
            let mut state = self.lock();
            let session = state
                .sessions
                .get_mut(session_id)
                .ok_or_else(|| StoreError::NotFound(format!("no chat session {session_id}")))?;
            let message = ChatMessage {
                id: session.next_id,
                sender,
                text: text.to_owned(),
                timestamp: now,
                kind,
            };
            session.next_id += 1;
            session.messages.push(message.clone());
            if now > session.last_seen {
                session.last_seen = now;
            }
            message
        };
        self.persist();
        Ok(message)
    }

    /// Messages with `id > after_id`, ascending.  `after_id` may be
    /// negative (everything) or past the newest id (empty).
    pub fn messages_since(
        &self,
        session_id: &str,
        after_id: i64,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let state = self.lock();
        let session = state
            .sessions
            .get(session_id)
            .ok_or_else(|| StoreError::NotFound(format!("no chat session {session_id}")))?;
        Ok(session
            .messages
            .iter()
            .filter(|m| m.id > after_id)
            .cloned()
            .collect())
    }

    /// Advance a read watermark; watermarks only ever move forward.
    pub fn mark_read(
        &self,
        session_id: &str,
        role: ReadRole,
        message_id: i64,
    ) -> Result<(), StoreError> {
        {
            let mut state = self.lock();
            let session = state
                .sessions
                .get_mut(session_id)
                .ok_or_else(|| StoreError::NotFound(format!("no chat session {session_id}")))?;
            match role {
                ReadRole::Visitor => {
                    session.last_visitor_read = session.last_visitor_read.max(message_id);
                }
                ReadRole::Admin => {
                    session.last_admin_read = session.last_admin_read.max(message_id);
                }
            }
        }
        self.persist();
        Ok(())
    }

    pub fn get_session(&self, session_id: &str) -> Option<ChatSession> {
        self.lock().sessions.get(session_id).cloned()
    }

    /// All sessions, most recently active first (admin inbox order).
    pub fn list_sessions(&self) -> Vec<ChatSession> {
        let mut sessions: Vec<ChatSession> = self.lock().sessions.values().cloned().collect();
        sessions.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        sessions
    }

    /// Hard-delete a session (explicit admin action).
    pub fn close_session(&self, session_id: &str) -> Result<(), StoreError> {
        let removed = self.lock().sessions.remove(session_id).is_some();
        if !removed {
            return Err(StoreError::NotFound(format!("no chat session {session_id}")));
        }
        self.persist();
        Ok(())
    }

    /// Global gate for visitor-initiated sends.
    pub fn is_online(&self) -> bool {
        self.lock().online
    }

    pub fn set_online(&self, online: bool) {
        self.lock().online = online;
        self.persist();
    }
}
