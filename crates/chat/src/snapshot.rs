use std::sync::Arc;

use espresso_client::{ChatId, ChatSummary};

use crate::slot::ChatSlot;

/// Everything the view layer may read, captured at one point in time.
///
/// The shape is the same whether or not a session is authenticated; absent
/// values are simply `None` or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSnapshot {
    pub chats: Arc<Vec<ChatSummary>>,
    pub active_chat_id: Option<ChatId>,
    pub primary: Option<Arc<ChatSummary>>,
    pub secondary: Option<Arc<ChatSummary>>,
    pub primary_busy: bool,
    pub secondary_busy: bool,
}

impl ChatSnapshot {
    pub fn chat(&self, slot: ChatSlot) -> Option<&ChatSummary> {
        match slot {
            ChatSlot::Primary => self.primary.as_deref(),
            ChatSlot::Secondary => self.secondary.as_deref(),
        }
    }

    /// True while a send on `slot` has not finished; input should be disabled.
    pub fn is_busy(&self, slot: ChatSlot) -> bool {
        match slot {
            ChatSlot::Primary => self.primary_busy,
            ChatSlot::Secondary => self.secondary_busy,
        }
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }
}
