//! Chat state management for the espresso client.
//!
//! [`ChatStore`] owns the chat list plus a primary and a secondary (forked)
//! chat slot and runs the optimistic send cycle against a
//! [`espresso_client::ChatBackend`]. Replies are revealed with the
//! [`TypingSimulator`]. Views read [`ChatSnapshot`]s and the helpers in
//! [`presentation`].

pub mod error;
pub mod presentation;
pub mod settings;
pub mod slot;
pub mod snapshot;
pub mod store;
pub mod typing;

#[cfg(test)]
mod testing;

pub use error::{ChatError, ChatResult};
pub use presentation::{SidebarEntry, can_fork, preview_text, sidebar_entries, visible_messages};
pub use settings::{Settings, SettingsError};
pub use slot::{ChatSlot, SendTarget, StreamSessionId};
pub use snapshot::ChatSnapshot;
pub use store::{ChatStore, SendOutcome, StoreSettings};
pub use typing::{DEFAULT_TYPING_TICK, TypingCanceller, TypingEnd, TypingHandle, TypingSimulator};
