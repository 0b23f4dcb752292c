use std::fmt;
use std::sync::Arc;

use espresso_client::{ChatId, ChatSummary};

use crate::typing::TypingCanceller;

/// One of the two independently addressable chat views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatSlot {
    Primary,
    Secondary,
}

impl fmt::Display for ChatSlot {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => formatter.write_str("primary"),
            Self::Secondary => formatter.write_str("secondary"),
        }
    }
}

/// Identifier for one send cycle.
///
/// This must change on every send so callbacks of an older cycle can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamSessionId(pub u64);

/// Routing key carried by every deferred mutation of a send cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SendTarget {
    pub slot: ChatSlot,
    /// Slot generation at the time the send started.
    pub epoch: u64,
    pub session: StreamSessionId,
    pub chat_id: ChatId,
}

/// Contents of one slot plus the bookkeeping needed to reject stale callbacks.
#[derive(Debug, Default)]
pub(crate) struct SlotState {
    pub(crate) chat: Option<Arc<ChatSummary>>,
    // Bumped whenever the slot is replaced or cleared.
    pub(crate) epoch: u64,
    pub(crate) in_flight: Option<SendTarget>,
    pub(crate) typing: Option<TypingCanceller>,
}

impl SlotState {
    /// Installs `chat` (or clears the slot) and abandons any running send cycle.
    pub(crate) fn replace(&mut self, chat: Option<ChatSummary>) {
        self.abandon_send();
        self.epoch = self.epoch.wrapping_add(1);
        self.chat = chat.map(Arc::new);
    }

    pub(crate) fn abandon_send(&mut self) {
        if let Some(typing) = self.typing.take() {
            typing.cancel();
        }
        self.in_flight = None;
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The chat, if `target` is still the live send cycle of this slot.
    pub(crate) fn current_chat_mut(&mut self, target: SendTarget) -> Option<&mut ChatSummary> {
        if self.epoch != target.epoch || self.in_flight != Some(target) {
            return None;
        }

        let chat = self.chat.as_mut()?;
        if chat.id != target.chat_id {
            return None;
        }

        Some(Arc::make_mut(chat))
    }

    pub(crate) fn finish_send(&mut self, target: SendTarget) {
        if self.in_flight == Some(target) {
            self.in_flight = None;
            self.typing = None;
        }
    }
}
