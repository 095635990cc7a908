//! Optional LLM-backed chat autopilot.
//!
//! Makes exactly one chat-completion call per visitor message against an
//! OpenAI-compatible endpoint.  "No reply" is a normal, silent outcome:
//! disabled or incomplete settings, transport errors, timeouts, and
//! malformed responses all return `None` and never propagate.

use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::chat::{ChatMessage, MessageKind, Sender};
use crate::document::JsonDocument;

/// How many trailing messages of the conversation are sent as context.
const HISTORY_LIMIT: usize = 12;

const COMPLETION_TIMEOUT: Duration = Duration::from_secs(15);

const SYSTEM_INSTRUCTION: &str = "You are the website assistant for a small local business. \
Answer visitor questions briefly and politely using only the business profile and website \
knowledge below. If you do not know the answer, say so and suggest leaving contact details \
so the owner can follow up.";

/// Autopilot settings, persisted as their own JSON document and editable
/// through the admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotSettings {
    pub enabled: bool,
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub api_key: String,
    pub business_profile: String,
    pub website_knowledge: String,
}

impl Default for AutopilotSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "openai".to_owned(),
            base_url: "https://api.openai.com/v1".to_owned(),
            model: "gpt-4o-mini".to_owned(),
            temperature: 0.7,
            api_key: String::new(),
            business_profile: String::new(),
            website_knowledge: String::new(),
        }
    }
}

impl AutopilotSettings {
    fn ready(&self) -> bool {
        self.enabled && !self.api_key.is_empty() && !self.model.is_empty()
    }
}

pub struct AutopilotResponder {
    doc: JsonDocument,
    settings: Mutex<AutopilotSettings>,
    http: reqwest::Client,
}

impl AutopilotResponder {
    pub fn open(doc: JsonDocument) -> Self {
        let settings: AutopilotSettings = doc.load();
        Self {
            doc,
            settings: Mutex::new(settings),
            http: reqwest::Client::builder()
                .timeout(COMPLETION_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn settings(&self) -> AutopilotSettings {
        match self.settings.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update_settings(&self, settings: AutopilotSettings) {
        match self.settings.lock() {
            Ok(mut guard) => *guard = settings.clone(),
            Err(poisoned) => *poisoned.into_inner() = settings.clone(),
        }
        self.doc.save(&settings);
    }

    /// Produce an assistant reply for the conversation, or `None`.
    pub async fn reply(&self, conversation: &[ChatMessage]) -> Option<String> {
        let settings = self.settings();
        if !settings.ready() {
            return None;
        }
        let messages = build_messages(&settings, conversation);
        let url = format!(
            "{}/chat/completions",
            settings.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": settings.model,
            "temperature": settings.temperature,
            "messages": messages,
        });
        let response = match self
            .http
            .post(&url)
            .bearer_auth(&settings.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "autopilot completion call failed");
                return None;
            }
        };
        let parsed: serde_json::Value = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "autopilot completion body not parseable");
                return None;
            }
        };
        let text = parsed
            .get("choices")?
            .get(0)?
            .get("message")?
            .get("content")?
            .as_str()?
            .trim()
            .to_owned();
        if text.is_empty() { None } else { Some(text) }
    }
}

/// Assemble the completion payload: fixed instruction plus knowledge
/// blocks, then the last [`HISTORY_LIMIT`] non-invite messages with
/// admin/autopilot senders mapped to the assistant role.
fn build_messages(
    settings: &AutopilotSettings,
    conversation: &[ChatMessage],
) -> Vec<serde_json::Value> {
    let mut system = String::from(SYSTEM_INSTRUCTION);
    if !settings.business_profile.is_empty() {
        system.push_str("\n\nBusiness profile:\n");
        system.push_str(&settings.business_profile);
    }
    if !settings.website_knowledge.is_empty() {
        system.push_str("\n\nWebsite knowledge:\n");
        system.push_str(&settings.website_knowledge);
    }
    let mut messages = vec![json!({ "role": "system", "content": system })];
    let tail: Vec<&ChatMessage> = conversation
        .iter()
        .filter(|m| m.kind != MessageKind::Invite)
        .collect();
    let start = tail.len().saturating_sub(HISTORY_LIMIT);
    for message in &tail[start..] {
        let role = match message.sender {
            Sender::Admin | Sender::Autopilot => "assistant",
            Sender::Visitor => "user",
        };
        messages.push(json!({ "role": role, "content": message.text }));
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn msg(id: i64, sender: Sender, kind: MessageKind, text: &str) -> ChatMessage {
        ChatMessage {
            id,
            sender,
            text: text.to_owned(),
            timestamp: Utc.timestamp_opt(1_700_000_000 + id, 0).unwrap(),
            kind,
        }
    }

    #[test]
    fn invite_messages_are_excluded_from_context() {
        let settings = AutopilotSettings::default();
        let conversation = vec![
            msg(1, Sender::Admin, MessageKind::Invite, "need help?"),
            msg(2, Sender::Visitor, MessageKind::Message, "what are your hours?"),
        ];
        let messages = build_messages(&settings, &conversation);
        assert_eq!(messages.len(), 2); // system + one visitor message
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "what are your hours?");
    }

    #[test]
    fn history_is_truncated_to_the_last_twelve() {
        let settings = AutopilotSettings::default();
        let conversation: Vec<ChatMessage> = (1..=20)
            .map(|i| msg(i, Sender::Visitor, MessageKind::Message, &format!("m{i}")))
            .collect();
        let messages = build_messages(&settings, &conversation);
        assert_eq!(messages.len(), 1 + 12);
        assert_eq!(messages[1]["content"], "m9");
        assert_eq!(messages[12]["content"], "m20");
    }

    #[test]
    fn admin_and_autopilot_map_to_assistant_role() {
        let settings = AutopilotSettings::default();
        let conversation = vec![
            msg(1, Sender::Visitor, MessageKind::Message, "hi"),
            msg(2, Sender::Admin, MessageKind::Message, "hello"),
            msg(3, Sender::Autopilot, MessageKind::Autopilot, "how can I help?"),
        ];
        let messages = build_messages(&settings, &conversation);
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["role"], "assistant");
    }

    #[test]
    fn knowledge_blocks_are_embedded_in_the_system_message() {
        let settings = AutopilotSettings {
            business_profile: "Family plumbing business in Leeds.".to_owned(),
            website_knowledge: "Open Mon-Fri 8am-6pm.".to_owned(),
            ..AutopilotSettings::default()
        };
        let messages = build_messages(&settings, &[]);
        let system = messages[0]["content"].as_str().unwrap();
        assert!(system.contains("Family plumbing business"));
        assert!(system.contains("Open Mon-Fri"));
    }

    #[tokio::test]
    async fn disabled_settings_yield_no_reply() {
        let dir = tempfile::tempdir().unwrap();
        let responder = AutopilotResponder::open(JsonDocument::new(dir.path().join("ap.json")));
        let conversation = vec![msg(1, Sender::Visitor, MessageKind::Message, "hi")];
        assert!(responder.reply(&conversation).await.is_none());
    }

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ap.json");
        {
            let responder = AutopilotResponder::open(JsonDocument::new(&path));
            responder.update_settings(AutopilotSettings {
                enabled: true,
                model: "gpt-4o".to_owned(),
                api_key: "sk-test".to_owned(),
                ..AutopilotSettings::default()
            });
        }
        let reloaded = AutopilotResponder::open(JsonDocument::new(&path));
        let settings = reloaded.settings();
        assert!(settings.enabled);
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.api_key, "sk-test");
    }
}
