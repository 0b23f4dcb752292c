use espresso_client::{ChatId, ClientError, MessageId};
use snafu::Snafu;

use crate::slot::ChatSlot;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ChatError {
    #[snafu(display("message is empty"))]
    EmptyMessage { stage: &'static str },
    #[snafu(display("a message is already being sent in the {slot} chat"))]
    SendInFlight {
        stage: &'static str,
        slot: ChatSlot,
    },
    #[snafu(display("message {message_id} has not been saved yet and cannot be forked"))]
    SentinelForkTarget {
        stage: &'static str,
        message_id: MessageId,
    },
    #[snafu(display("failed to load chat {chat_id}: {source}"))]
    Load {
        stage: &'static str,
        chat_id: ChatId,
        source: ClientError,
    },
    #[snafu(display("failed to create chat: {source}"))]
    Create {
        stage: &'static str,
        source: ClientError,
    },
    #[snafu(display("failed to send message in the {slot} chat: {source}"))]
    Send {
        stage: &'static str,
        slot: ChatSlot,
        source: ClientError,
    },
    #[snafu(display("failed to fork chat: {source}"))]
    Fork {
        stage: &'static str,
        source: ClientError,
    },
}

pub type ChatResult<T> = Result<T, ChatError>;

impl ChatError {
    /// The backend failure underneath, if any.
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            Self::Load { source, .. }
            | Self::Create { source, .. }
            | Self::Send { source, .. }
            | Self::Fork { source, .. } => Some(source),
            Self::EmptyMessage { .. }
            | Self::SendInFlight { .. }
            | Self::SentinelForkTarget { .. } => None,
        }
    }
}
