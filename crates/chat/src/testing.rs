//! In-memory backend double for store tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use espresso_client::{
    ChatBackend, ChatId, ChatKind, ChatSummary, ClientError, ClientResult, ForkRequest, Message,
    MessageId, NewMessage, Role,
};
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReplyMode {
    Fixed(String),
    Echo,
    MissingContent,
    // Answers with an empty record and stores nothing.
    NoMessages,
}

struct FakeState {
    chats: BTreeMap<ChatId, ChatSummary>,
    next_chat_id: i64,
    next_message_id: i64,
    reply: ReplyMode,
    fail_list: bool,
    fail_append: bool,
    calls: Vec<String>,
}

pub(crate) struct FakeBackend {
    state: Mutex<FakeState>,
    // When set, each append waits for one `notify_one` before answering.
    append_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeBackend {
    pub(crate) fn new(reply: ReplyMode) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                chats: BTreeMap::new(),
                next_chat_id: 1,
                next_message_id: 1,
                reply,
                fail_list: false,
                fail_append: false,
                calls: Vec::new(),
            }),
            append_gate: Mutex::new(None),
        })
    }

    pub(crate) fn replying(text: &str) -> Arc<Self> {
        Self::new(ReplyMode::Fixed(text.to_string()))
    }

    pub(crate) fn gate_appends(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.append_gate.lock() = Some(gate.clone());
        gate
    }

    pub(crate) fn set_fail_list(&self, fail: bool) {
        self.state.lock().fail_list = fail;
    }

    pub(crate) fn set_fail_append(&self, fail: bool) {
        self.state.lock().fail_append = fail;
    }

    pub(crate) fn set_reply(&self, reply: ReplyMode) {
        self.state.lock().reply = reply;
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Seeds a persisted primary chat with alternating user/assistant turns.
    pub(crate) fn seed_chat(&self, turns: &[(&str, &str)]) -> ChatId {
        let mut state = self.state.lock();
        let chat_id = ChatId::new(state.next_chat_id);
        state.next_chat_id += 1;

        let mut chat = ChatSummary::new(chat_id, ChatKind::Primary);
        for (user, assistant) in turns {
            let user_id = state.alloc_message_id();
            chat.messages.push(Message::new(user_id, Role::User, *user));
            let assistant_id = state.alloc_message_id();
            chat.messages
                .push(Message::new(assistant_id, Role::Assistant, *assistant));
        }
        state.chats.insert(chat_id, chat);
        chat_id
    }

    pub(crate) fn stored_chat(&self, chat_id: ChatId) -> Option<ChatSummary> {
        self.state.lock().chats.get(&chat_id).cloned()
    }
}

impl FakeState {
    fn alloc_message_id(&mut self) -> MessageId {
        let id = MessageId::new(self.next_message_id);
        self.next_message_id += 1;
        id
    }

    fn not_found(path: String) -> ClientError {
        ClientError::Status {
            stage: "fake-backend",
            method: "GET",
            path,
            status: 404,
            body: "{\"detail\":\"Chat not found\"}".to_string(),
        }
    }
}

impl ChatBackend for FakeBackend {
    fn list_chats(&self) -> BoxFuture<'_, ClientResult<Vec<ChatSummary>>> {
        async move {
            let mut state = self.state.lock();
            state.calls.push("list_chats".to_string());
            if state.fail_list {
                return Err(ClientError::Status {
                    stage: "fake-backend",
                    method: "GET",
                    path: "/chats/".to_string(),
                    status: 500,
                    body: "boom".to_string(),
                });
            }

            Ok(state
                .chats
                .values()
                .rev()
                .filter(|chat| chat.is_primary())
                .cloned()
                .collect())
        }
        .boxed()
    }

    fn create_chat(&self) -> BoxFuture<'_, ClientResult<ChatSummary>> {
        async move {
            let mut state = self.state.lock();
            state.calls.push("create_chat".to_string());
            let chat_id = ChatId::new(state.next_chat_id);
            state.next_chat_id += 1;
            let chat = ChatSummary::new(chat_id, ChatKind::Primary);
            state.chats.insert(chat_id, chat.clone());
            Ok(chat)
        }
        .boxed()
    }

    fn get_chat(&self, chat_id: ChatId) -> BoxFuture<'_, ClientResult<ChatSummary>> {
        async move {
            let mut state = self.state.lock();
            state.calls.push(format!("get_chat:{chat_id}"));
            state
                .chats
                .get(&chat_id)
                .cloned()
                .ok_or_else(|| FakeState::not_found(format!("/chats/{chat_id}")))
        }
        .boxed()
    }

    fn append_message(
        &self,
        chat_id: ChatId,
        message: NewMessage,
    ) -> BoxFuture<'_, ClientResult<ChatSummary>> {
        async move {
            self.state
                .lock()
                .calls
                .push(format!("append_message:{chat_id}:{}", message.content));

            let gate = self.append_gate.lock().clone();
            if let Some(gate) = gate {
                gate.notified().await;
            }

            let mut state = self.state.lock();
            if state.fail_append {
                return Err(ClientError::Status {
                    stage: "fake-backend",
                    method: "POST",
                    path: format!("/chats/{chat_id}/messages"),
                    status: 502,
                    body: "upstream model failed".to_string(),
                });
            }

            let reply = state.reply.clone();
            if reply == ReplyMode::NoMessages {
                let kind = state
                    .chats
                    .get(&chat_id)
                    .map(|chat| chat.kind)
                    .unwrap_or(ChatKind::Primary);
                return Ok(ChatSummary::new(chat_id, kind));
            }

            let user_id = state.alloc_message_id();
            let assistant_id = state.alloc_message_id();
            let Some(chat) = state.chats.get_mut(&chat_id) else {
                return Err(FakeState::not_found(format!("/chats/{chat_id}/messages")));
            };

            chat.messages
                .push(Message::new(user_id, Role::User, message.content.clone()));
            let mut assistant = Message::new(assistant_id, Role::Assistant, "");
            assistant.content = match reply {
                ReplyMode::Fixed(text) => Some(text),
                ReplyMode::Echo => Some(format!("echo: {}", message.content)),
                ReplyMode::MissingContent | ReplyMode::NoMessages => None,
            };
            chat.messages.push(assistant);
            Ok(chat.clone())
        }
        .boxed()
    }

    fn create_fork(&self, request: ForkRequest) -> BoxFuture<'_, ClientResult<ChatSummary>> {
        async move {
            let mut state = self.state.lock();
            state.calls.push(format!(
                "create_fork:{}:{}",
                request.parent_chat_id, request.parent_message_id
            ));

            let parent_content = state
                .chats
                .get(&request.parent_chat_id)
                .and_then(|chat| {
                    chat.messages
                        .iter()
                        .find(|message| message.id == request.parent_message_id)
                })
                .map(|message| message.text().to_string())
                .ok_or_else(|| FakeState::not_found("/chats/fork".to_string()))?;

            let chat_id = ChatId::new(state.next_chat_id);
            state.next_chat_id += 1;
            let seed_id = state.alloc_message_id();
            let copy_id = state.alloc_message_id();

            let mut fork = ChatSummary::new(chat_id, ChatKind::Forked).with_messages(vec![
                Message::new(seed_id, Role::System, "explain step by step"),
                Message::new(copy_id, Role::Assistant, parent_content),
            ]);
            fork.parent_chat_id = Some(request.parent_chat_id);
            fork.parent_message_id = Some(request.parent_message_id);
            state.chats.insert(chat_id, fork.clone());
            Ok(fork)
        }
        .boxed()
    }
}
