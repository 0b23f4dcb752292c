use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use espresso_client::{
    ChatBackend, ChatId, ChatSummary, ForkRequest, Message, MessageId, MessageStatus, NewMessage,
    Role,
};
use parking_lot::Mutex;
use snafu::{ResultExt, ensure};
use tokio::sync::watch;

use crate::error::{
    ChatResult, CreateSnafu, EmptyMessageSnafu, ForkSnafu, LoadSnafu, SendInFlightSnafu,
    SendSnafu, SentinelForkTargetSnafu,
};
use crate::slot::{ChatSlot, SendTarget, SlotState, StreamSessionId};
use crate::snapshot::ChatSnapshot;
use crate::typing::{DEFAULT_TYPING_TICK, TypingSimulator};

const UNCONFIRMED_REASON: &str = "the backend did not return the message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSettings {
    pub typing_tick: Duration,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            typing_tick: DEFAULT_TYPING_TICK,
        }
    }
}

/// How a send cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The target slot was empty; nothing was sent.
    Skipped,
    /// The backend replied without usable text; the reply was shown as-is.
    Degenerate,
    /// The reply was revealed and replaced by the server message.
    Revealed,
    /// The slot was replaced or cleared before the cycle finished.
    Abandoned,
}

/// Single source of truth for the chat list and the primary and secondary slots.
///
/// Cloning yields another handle to the same state. Readers take a
/// [`ChatSnapshot`] or subscribe to changes; every mutation publishes a new
/// snapshot and never touches one already handed out.
#[derive(Clone)]
pub struct ChatStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    backend: Arc<dyn ChatBackend>,
    typing: TypingSimulator,
    state: Mutex<StoreState>,
    changes: watch::Sender<ChatSnapshot>,
    next_session: AtomicU64,
}

#[derive(Default)]
struct StoreState {
    chats: Arc<Vec<ChatSummary>>,
    active_chat_id: Option<ChatId>,
    primary: SlotState,
    secondary: SlotState,
}

impl StoreState {
    fn slot_mut(&mut self, slot: ChatSlot) -> &mut SlotState {
        match slot {
            ChatSlot::Primary => &mut self.primary,
            ChatSlot::Secondary => &mut self.secondary,
        }
    }

    fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            chats: self.chats.clone(),
            active_chat_id: self.active_chat_id,
            primary: self.primary.chat.clone(),
            secondary: self.secondary.chat.clone(),
            primary_busy: self.primary.is_busy(),
            secondary_busy: self.secondary.is_busy(),
        }
    }
}

impl ChatStore {
    pub fn new(backend: Arc<dyn ChatBackend>, settings: StoreSettings) -> Self {
        let (changes, _) = watch::channel(ChatSnapshot::default());
        Self {
            inner: Arc::new(StoreInner {
                backend,
                typing: TypingSimulator::new(settings.typing_tick),
                state: Mutex::new(StoreState::default()),
                changes,
                next_session: AtomicU64::new(1),
            }),
        }
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        self.inner.state.lock().snapshot()
    }

    /// Receiver that is marked changed after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.inner.changes.subscribe()
    }

    /// Replaces the chat list. Failures are logged and the previous list is kept.
    pub async fn load_chats(&self) {
        match self.inner.backend.list_chats().await {
            Ok(chats) => {
                tracing::debug!(count = chats.len(), "chat list refreshed");
                self.update(|state| state.chats = Arc::new(chats));
            }
            Err(error) => {
                tracing::warn!(error = %error, "failed to refresh chat list, keeping previous list");
            }
        }
    }

    /// Loads `chat_id` into the primary slot and marks it active.
    pub async fn load_chat(&self, chat_id: ChatId) -> ChatResult<()> {
        let chat = self
            .inner
            .backend
            .get_chat(chat_id)
            .await
            .context(LoadSnafu {
                stage: "get-chat",
                chat_id,
            })?;

        self.update(|state| {
            state.primary.replace(Some(chat));
            state.active_chat_id = Some(chat_id);
        });
        Ok(())
    }

    /// Creates an empty chat, makes it primary and active, and puts it first in the list.
    pub async fn start_new_chat(&self) -> ChatResult<ChatId> {
        let chat = self
            .inner
            .backend
            .create_chat()
            .await
            .context(CreateSnafu {
                stage: "create-chat",
            })?;
        let chat_id = chat.id;

        self.update(|state| {
            Arc::make_mut(&mut state.chats).insert(0, chat.clone());
            state.primary.replace(Some(chat));
            state.active_chat_id = Some(chat_id);
        });
        Ok(chat_id)
    }

    pub async fn send_primary_message(&self, content: impl Into<String>) -> ChatResult<SendOutcome> {
        self.send_message(ChatSlot::Primary, content.into()).await
    }

    pub async fn send_secondary_message(
        &self,
        content: impl Into<String>,
    ) -> ChatResult<SendOutcome> {
        self.send_message(ChatSlot::Secondary, content.into()).await
    }

    /// Forks the primary chat at `message_id` into the secondary slot.
    ///
    /// Does nothing when no primary chat is loaded. Any previous secondary chat
    /// is replaced.
    pub async fn open_fork(&self, message_id: MessageId) -> ChatResult<()> {
        let Some(parent_chat_id) = self.snapshot().primary.map(|chat| chat.id) else {
            tracing::debug!(%message_id, "no primary chat loaded, ignoring fork request");
            return Ok(());
        };
        ensure!(
            message_id.is_persisted(),
            SentinelForkTargetSnafu {
                stage: "open-fork",
                message_id,
            }
        );

        let fork = self
            .inner
            .backend
            .create_fork(ForkRequest::new(parent_chat_id, message_id))
            .await
            .context(ForkSnafu {
                stage: "create-fork",
            })?;

        tracing::debug!(chat_id = %fork.id, %parent_chat_id, %message_id, "fork opened");
        self.update(|state| state.secondary.replace(Some(fork)));
        Ok(())
    }

    pub fn close_secondary(&self) {
        self.update(|state| state.secondary.replace(None));
    }

    /// Returns every field to its initial empty value and stops running reveals.
    pub fn reset(&self) {
        self.update(|state| {
            state.primary.replace(None);
            state.secondary.replace(None);
            state.chats = Arc::default();
            state.active_chat_id = None;
        });
    }

    async fn send_message(&self, slot: ChatSlot, content: String) -> ChatResult<SendOutcome> {
        ensure!(
            !content.trim().is_empty(),
            EmptyMessageSnafu {
                stage: "send-message",
            }
        );

        let Some(target) = self.begin_send(slot, &content)? else {
            tracing::debug!(%slot, "no chat in slot, skipping send");
            return Ok(SendOutcome::Skipped);
        };
        tracing::debug!(
            %slot,
            chat_id = %target.chat_id,
            session = target.session.0,
            "sending message"
        );

        let result = self
            .inner
            .backend
            .append_message(target.chat_id, NewMessage::user(content))
            .await;
        if let Err(error) = &result {
            let reason = error.to_string();
            self.apply_to_send(target, true, |chat| mark_failed(chat, reason));
            tracing::error!(%slot, chat_id = %target.chat_id, error = %error, "failed to send message");
        }
        let record = result.context(SendSnafu {
            stage: "append-message",
            slot,
        })?;

        if slot == ChatSlot::Primary {
            self.refresh_list_entry(&record);
        }

        let reply = record.last_message().cloned();
        let echo = record
            .messages
            .iter()
            .rev()
            .skip(1)
            .find(|message| message.role == Role::User)
            .cloned();
        let reveal_text = reply.as_ref().and_then(|message| message.content.clone());

        let Some(reveal_text) = reveal_text else {
            let applied = self.apply_to_send(target, true, |chat| {
                confirm_echo(chat, echo);
                resolve_placeholder(chat, reply);
            });
            return Ok(if applied {
                SendOutcome::Degenerate
            } else {
                SendOutcome::Abandoned
            });
        };

        if !self.apply_to_send(target, false, |chat| confirm_echo(chat, echo)) {
            return Ok(SendOutcome::Abandoned);
        }

        Ok(self.reveal(target, reveal_text, reply).await)
    }

    // Appends the optimistic pair and marks the slot busy.
    fn begin_send(&self, slot: ChatSlot, content: &str) -> ChatResult<Option<SendTarget>> {
        let mut state = self.inner.state.lock();
        let slot_state = state.slot_mut(slot);
        let Some(chat_id) = slot_state.chat.as_ref().map(|chat| chat.id) else {
            return Ok(None);
        };
        ensure!(
            !slot_state.is_busy(),
            SendInFlightSnafu {
                stage: "send-message",
                slot,
            }
        );

        let target = SendTarget {
            slot,
            epoch: slot_state.epoch,
            session: StreamSessionId(self.inner.next_session.fetch_add(1, Ordering::Relaxed)),
            chat_id,
        };
        slot_state.in_flight = Some(target);
        if let Some(chat) = slot_state.current_chat_mut(target) {
            chat.messages.push(Message::optimistic_user(content));
            chat.messages.push(Message::thinking());
        }

        self.inner.changes.send_replace(state.snapshot());
        Ok(Some(target))
    }

    async fn reveal(&self, target: SendTarget, text: String, reply: Option<Message>) -> SendOutcome {
        let revealed = Arc::new(AtomicBool::new(false));
        let chunk_store = self.clone();
        let done_store = self.clone();
        let done_flag = revealed.clone();

        let handle = self.inner.typing.simulate(
            text,
            move |partial: &str| {
                chunk_store.apply_to_send(target, false, |chat| {
                    if let Some(placeholder) = chat.thinking_placeholder_mut() {
                        placeholder.content = Some(partial.to_string());
                    }
                });
            },
            move || {
                if done_store.apply_to_send(target, true, |chat| resolve_placeholder(chat, reply)) {
                    done_flag.store(true, Ordering::SeqCst);
                }
            },
        );

        {
            let mut state = self.inner.state.lock();
            let slot_state = state.slot_mut(target.slot);
            if slot_state.in_flight == Some(target) {
                slot_state.typing = Some(handle.canceller());
            } else {
                handle.cancel();
            }
        }

        let end = handle.wait().await;
        if revealed.load(Ordering::SeqCst) {
            return SendOutcome::Revealed;
        }

        tracing::debug!(slot = %target.slot, session = target.session.0, ?end, "reveal abandoned");
        self.update(|state| state.slot_mut(target.slot).finish_send(target));
        SendOutcome::Abandoned
    }

    fn refresh_list_entry(&self, record: &ChatSummary) {
        self.update(|state| {
            if let Some(index) = state.chats.iter().position(|chat| chat.id == record.id) {
                Arc::make_mut(&mut state.chats)[index] = record.clone();
            }
        });
    }

    /// Applies `mutate` to the target chat if `target` is still the live send
    /// of its slot and the thinking placeholder is present. Returns whether it ran.
    fn apply_to_send<F>(&self, target: SendTarget, finish: bool, mutate: F) -> bool
    where
        F: FnOnce(&mut ChatSummary),
    {
        let mut state = self.inner.state.lock();
        let slot_state = state.slot_mut(target.slot);
        let applied = match slot_state.current_chat_mut(target) {
            Some(chat) if chat.has_thinking_placeholder() => {
                mutate(chat);
                true
            }
            _ => false,
        };

        if !applied {
            tracing::debug!(
                slot = %target.slot,
                chat_id = %target.chat_id,
                session = target.session.0,
                "dropping update for stale send"
            );
            return false;
        }

        if finish {
            slot_state.finish_send(target);
        }
        self.inner.changes.send_replace(state.snapshot());
        true
    }

    fn update<R>(&self, mutate: impl FnOnce(&mut StoreState) -> R) -> R {
        let mut state = self.inner.state.lock();
        let result = mutate(&mut state);
        self.inner.changes.send_replace(state.snapshot());
        result
    }
}

fn confirm_echo(chat: &mut ChatSummary, echo: Option<Message>) {
    let Some(pending) = chat
        .messages
        .iter_mut()
        .rev()
        .find(|message| message.id == MessageId::OPTIMISTIC && message.is_pending())
    else {
        return;
    };

    // Without an echo the backend never confirmed the message.
    match echo {
        Some(echo) => *pending = echo,
        None => pending.status = MessageStatus::Failed(UNCONFIRMED_REASON.to_string()),
    }
}

fn resolve_placeholder(chat: &mut ChatSummary, reply: Option<Message>) {
    let Some(index) = chat
        .messages
        .iter()
        .position(|message| message.id == MessageId::THINKING)
    else {
        return;
    };

    match reply {
        Some(mut reply) => {
            reply.status = MessageStatus::Persisted;
            chat.messages[index] = reply;
        }
        None => {
            chat.messages.remove(index);
        }
    }
}

fn mark_failed(chat: &mut ChatSummary, reason: String) {
    chat.messages
        .retain(|message| message.id != MessageId::THINKING);
    if let Some(pending) = chat
        .messages
        .iter_mut()
        .rev()
        .find(|message| message.id == MessageId::OPTIMISTIC && message.is_pending())
    {
        pending.status = MessageStatus::Failed(reason);
    }
}
