use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::ids::{ChatId, MessageId};

/// Which kind of thread a chat is. Forks are reported as `"secondary"` by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Primary,
    #[serde(alias = "secondary")]
    Forked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Client-side lifecycle of a message. Never sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MessageStatus {
    #[default]
    Persisted,
    Pending,
    Thinking,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    // `None` when the backend sent no usable string.
    #[serde(default, deserialize_with = "deserialize_lenient_content")]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub status: MessageStatus,
}

impl Message {
    pub fn new(id: MessageId, role: Role, content: impl Into<String>) -> Self {
        Self {
            id,
            role,
            content: Some(content.into()),
            created_at: None,
            status: MessageStatus::Persisted,
        }
    }

    /// User message shown before the backend has confirmed it.
    pub fn optimistic_user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::OPTIMISTIC,
            role: Role::User,
            content: Some(content.into()),
            created_at: Some(Utc::now()),
            status: MessageStatus::Pending,
        }
    }

    /// Empty assistant placeholder that receives the revealed reply.
    pub fn thinking() -> Self {
        Self {
            id: MessageId::THINKING,
            role: Role::Assistant,
            content: Some(String::new()),
            created_at: None,
            status: MessageStatus::Thinking,
        }
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    pub fn is_thinking(&self) -> bool {
        matches!(self.status, MessageStatus::Thinking)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, MessageStatus::Pending)
    }

    pub fn failure(&self) -> Option<&str> {
        match &self.status {
            MessageStatus::Failed(reason) => Some(reason.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: ChatId,
    #[serde(rename = "type")]
    pub kind: ChatKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_chat_id: Option<ChatId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<MessageId>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ChatSummary {
    pub fn new(id: ChatId, kind: ChatKind) -> Self {
        Self {
            id,
            kind,
            parent_chat_id: None,
            parent_message_id: None,
            messages: Vec::new(),
        }
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn is_primary(&self) -> bool {
        self.kind == ChatKind::Primary
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn thinking_placeholder(&self) -> Option<&Message> {
        self.messages
            .iter()
            .find(|message| message.id == MessageId::THINKING)
    }

    pub fn thinking_placeholder_mut(&mut self) -> Option<&mut Message> {
        self.messages
            .iter_mut()
            .find(|message| message.id == MessageId::THINKING)
    }

    pub fn has_thinking_placeholder(&self) -> bool {
        self.thinking_placeholder().is_some()
    }
}

/// Body of `POST /chats/{id}/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub role: Role,
    pub content: String,
}

impl NewMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Body of `POST /chats/fork`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkRequest {
    pub parent_chat_id: ChatId,
    pub parent_message_id: MessageId,
}

impl ForkRequest {
    pub fn new(parent_chat_id: ChatId, parent_message_id: MessageId) -> Self {
        Self {
            parent_chat_id,
            parent_message_id,
        }
    }
}

fn deserialize_lenient_content<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(content)) => Some(content),
        _ => None,
    })
}

fn deserialize_lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_str).and_then(parse_timestamp))
}

// The backend emits naive ISO-8601 timestamps; treat those as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    raw.parse::<NaiveDateTime>()
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_backend_chat_record() {
        let payload = json!({
            "id": 3,
            "type": "primary",
            "parent_chat_id": null,
            "parent_message_id": null,
            "messages": [
                {"id": 10, "role": "user", "content": "hi", "created_at": "2025-01-02T03:04:05.123456"},
                {"id": 11, "role": "assistant", "content": "yo", "created_at": "2025-01-02T03:04:06Z"}
            ]
        });

        let chat: ChatSummary = serde_json::from_value(payload).expect("chat decodes");
        assert_eq!(chat.id, ChatId::new(3));
        assert!(chat.is_primary());
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[1].text(), "yo");
        assert_eq!(chat.messages[1].status, MessageStatus::Persisted);
        assert!(chat.messages.iter().all(|message| message.created_at.is_some()));
    }

    #[test]
    fn secondary_type_is_a_fork() {
        let payload = json!({
            "id": 9,
            "type": "secondary",
            "parent_chat_id": 3,
            "parent_message_id": 11
        });

        let chat: ChatSummary = serde_json::from_value(payload).expect("fork decodes");
        assert_eq!(chat.kind, ChatKind::Forked);
        assert_eq!(chat.parent_message_id, Some(MessageId::new(11)));
        assert!(chat.messages.is_empty());
    }

    #[test]
    fn non_string_content_becomes_none() {
        let payload = json!({"id": 5, "role": "assistant", "content": 42});
        let message: Message = serde_json::from_value(payload).expect("message decodes");
        assert_eq!(message.content, None);
        assert_eq!(message.text(), "");

        let payload = json!({"id": 6, "role": "assistant"});
        let message: Message = serde_json::from_value(payload).expect("message decodes");
        assert_eq!(message.content, None);
    }

    #[test]
    fn garbage_timestamp_is_dropped_not_fatal() {
        let payload = json!({"id": 5, "role": "user", "content": "a", "created_at": "yesterday"});
        let message: Message = serde_json::from_value(payload).expect("message decodes");
        assert_eq!(message.created_at, None);
    }

    #[test]
    fn request_bodies_match_wire_names() {
        let body = serde_json::to_value(NewMessage::user("hello")).unwrap_or_default();
        assert_eq!(body, json!({"role": "user", "content": "hello"}));

        let fork = ForkRequest::new(ChatId::new(1), MessageId::new(2));
        let body = serde_json::to_value(fork).unwrap_or_default();
        assert_eq!(body, json!({"parent_chat_id": 1, "parent_message_id": 2}));
    }

    #[test]
    fn local_constructors_use_sentinel_ids() {
        let user = Message::optimistic_user("hi");
        assert_eq!(user.id, MessageId::OPTIMISTIC);
        assert!(user.is_pending());
        assert!(user.created_at.is_some());

        let thinking = Message::thinking();
        assert_eq!(thinking.id, MessageId::THINKING);
        assert!(thinking.is_thinking());
        assert_eq!(thinking.text(), "");
    }
}
