//! Read-only helpers shaping store state for display.

use espresso_client::{ChatId, ChatSummary, Message, Role};

use crate::slot::ChatSlot;
use crate::snapshot::ChatSnapshot;

pub const PREVIEW_MAX_CHARS: usize = 60;
pub const EMPTY_CHAT_PREVIEW: &str = "New Chat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarEntry {
    pub chat_id: ChatId,
    pub preview: String,
    pub active: bool,
}

/// First line of the first user message, cut to [`PREVIEW_MAX_CHARS`] characters.
pub fn preview_text(chat: &ChatSummary) -> String {
    chat.messages
        .iter()
        .find(|message| message.role == Role::User)
        .and_then(|message| message.content.as_deref())
        .and_then(|content| content.lines().next())
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().take(PREVIEW_MAX_CHARS).collect())
        .unwrap_or_else(|| EMPTY_CHAT_PREVIEW.to_string())
}

pub fn sidebar_entries(snapshot: &ChatSnapshot) -> Vec<SidebarEntry> {
    snapshot
        .chats
        .iter()
        .filter(|chat| chat.is_primary())
        .map(|chat| SidebarEntry {
            chat_id: chat.id,
            preview: preview_text(chat),
            active: snapshot.active_chat_id == Some(chat.id),
        })
        .collect()
}

/// Messages a reader should see; system prompts stay hidden.
pub fn visible_messages(chat: &ChatSummary) -> impl Iterator<Item = &Message> {
    chat.messages
        .iter()
        .filter(|message| message.role != Role::System)
}

/// Whether a drill-down fork may be opened from `message`.
pub fn can_fork(message: &Message, slot: ChatSlot) -> bool {
    slot == ChatSlot::Primary
        && message.role == Role::Assistant
        && message.id.is_persisted()
        && !message.is_thinking()
}
