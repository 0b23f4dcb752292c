use std::fmt::Write as _;

use espresso_chat::{ChatError, ChatSlot, ChatSnapshot, can_fork, sidebar_entries, visible_messages};
use espresso_client::{ChatSummary, ClientErrorKind, Message, Role};

/// Turns successive snapshots into incremental terminal output for the
/// reply currently being revealed in each slot.
#[derive(Debug, Default)]
pub struct RevealPrinter {
    primary: Option<String>,
    secondary: Option<String>,
}

impl RevealPrinter {
    /// Text to print for the change from the previous snapshot to `snapshot`.
    pub fn observe(&mut self, snapshot: &ChatSnapshot) -> String {
        let mut output = String::new();
        for slot in [ChatSlot::Primary, ChatSlot::Secondary] {
            let current = snapshot
                .chat(slot)
                .and_then(ChatSummary::thinking_placeholder)
                .map(|message| message.text().to_string());
            let printed = match slot {
                ChatSlot::Primary => &mut self.primary,
                ChatSlot::Secondary => &mut self.secondary,
            };

            match (printed.as_deref(), current.as_deref()) {
                (None, Some(text)) => {
                    let _ = write!(output, "{} {text}", speaker(slot));
                }
                (Some(before), Some(text)) => match text.strip_prefix(before) {
                    Some(grown) => output.push_str(grown),
                    None => {
                        let _ = write!(output, "\n{} {text}", speaker(slot));
                    }
                },
                (Some(_), None) => output.push('\n'),
                (None, None) => {}
            }
            *printed = current;
        }
        output
    }
}

fn speaker(slot: ChatSlot) -> &'static str {
    match slot {
        ChatSlot::Primary => "assistant>",
        ChatSlot::Secondary => "drill-down>",
    }
}

pub fn chat_list(snapshot: &ChatSnapshot) -> String {
    let entries = sidebar_entries(snapshot);
    if entries.is_empty() {
        return "no chats yet, /new starts one".to_string();
    }

    entries
        .iter()
        .map(|entry| {
            let marker = if entry.active { '*' } else { ' ' };
            format!("{marker} {:>5}  {}", entry.chat_id.get(), entry.preview)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn transcript(chat: &ChatSummary, slot: ChatSlot) -> String {
    let mut output = String::new();
    for message in visible_messages(chat) {
        let _ = writeln!(output, "{}", message_line(message, slot));
    }
    output
}

fn message_line(message: &Message, slot: ChatSlot) -> String {
    let role = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
        Role::System => "system",
    };
    let mut line = format!("[{}] {role}: {}", message.id, message.text());
    if can_fork(message, slot) {
        let _ = write!(line, "  (/fork {})", message.id);
    }
    match message.failure() {
        Some(reason) => {
            let _ = write!(line, "  (not sent: {reason})");
        }
        None if message.id.is_sentinel() => line.push_str("  (sending)"),
        None => {}
    }
    line
}

/// One-line explanation of a store failure, distinguishing backend error kinds.
pub fn describe_error(error: &ChatError) -> String {
    let Some(source) = error.client_error() else {
        return error.to_string();
    };

    match source.kind() {
        ClientErrorKind::Network => format!("{error} (is the backend running?)"),
        ClientErrorKind::Status if source.is_not_found() => {
            format!("{error} (not found)")
        }
        ClientErrorKind::Status => format!("{error} (backend rejected the request)"),
        ClientErrorKind::MalformedPayload => format!("{error} (unexpected backend response)"),
        ClientErrorKind::Configuration => format!("{error} (check settings)"),
    }
}
