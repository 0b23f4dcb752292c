//! Backend contract of the espresso chat service.
//!
//! The wire types mirror the REST payloads, [`ChatBackend`] is the seam the
//! chat store talks to, and [`HttpChatBackend`] is the reqwest implementation.

pub mod credentials;
pub mod error;
pub mod http;
pub mod ids;
pub mod types;

use futures::future::BoxFuture;

pub use credentials::{API_KEY_HEADER, SessionCredentials};
pub use error::{ClientError, ClientErrorKind, ClientResult};
pub use http::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT, HttpChatBackend};
pub use ids::{ChatId, MessageId};
pub use types::{ChatKind, ChatSummary, ForkRequest, Message, MessageStatus, NewMessage, Role};

/// Chat CRUD, message append, and fork creation, one method per endpoint.
pub trait ChatBackend: Send + Sync {
    /// `GET /chats/`
    fn list_chats(&self) -> BoxFuture<'_, ClientResult<Vec<ChatSummary>>>;
    /// `POST /chats/`, returns an empty primary chat.
    fn create_chat(&self) -> BoxFuture<'_, ClientResult<ChatSummary>>;
    /// `GET /chats/{id}`
    fn get_chat(&self, chat_id: ChatId) -> BoxFuture<'_, ClientResult<ChatSummary>>;
    /// `POST /chats/{id}/messages`, returns the full updated chat including the reply.
    fn append_message(
        &self,
        chat_id: ChatId,
        message: NewMessage,
    ) -> BoxFuture<'_, ClientResult<ChatSummary>>;
    /// `POST /chats/fork`
    fn create_fork(&self, request: ForkRequest) -> BoxFuture<'_, ClientResult<ChatSummary>>;
}
