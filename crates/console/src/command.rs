use espresso_client::{ChatId, ClientError, MessageId};
use snafu::{OptionExt, ResultExt, Snafu};

pub const HELP: &str = "\
/chats              list chats
/open <chat-id>     open a chat
/new                start a new chat
/fork <message-id>  drill down into an assistant reply
/close              close the drill-down chat
/end                end the session and forget the API key
/help               show this help
/quit               exit
anything else is sent to the drill-down chat if open, otherwise to the main chat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Chats,
    Open(ChatId),
    New,
    Fork(MessageId),
    Close,
    End,
    Help,
    Quit,
    Say(String),
    Nothing,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CommandError {
    #[snafu(display("unknown command `/{name}`, try /help"))]
    Unknown { name: String },
    #[snafu(display("`/{command}` needs {argument}"))]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[snafu(display("{source}"))]
    BadId { source: ClientError },
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Self::Nothing);
        }
        // Messages go out as typed; only commands are trimmed.
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Ok(Self::Say(line.to_string()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let argument = parts.next();

        match name {
            "chats" => Ok(Self::Chats),
            "open" => {
                let raw = argument.context(MissingArgumentSnafu {
                    command: "open",
                    argument: "a chat id",
                })?;
                Ok(Self::Open(ChatId::parse(raw).context(BadIdSnafu)?))
            }
            "new" => Ok(Self::New),
            "fork" => {
                let raw = argument.context(MissingArgumentSnafu {
                    command: "fork",
                    argument: "a message id",
                })?;
                Ok(Self::Fork(MessageId::parse(raw).context(BadIdSnafu)?))
            }
            "close" => Ok(Self::Close),
            "end" => Ok(Self::End),
            "help" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => UnknownSnafu { name: other }.fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(
            Command::parse("  why is the sky blue? ").ok(),
            Some(Command::Say("  why is the sky blue? ".to_string()))
        );
        assert_eq!(Command::parse("   ").ok(), Some(Command::Nothing));
    }

    #[test]
    fn commands_take_ids() {
        assert_eq!(
            Command::parse("/open 12").ok(),
            Some(Command::Open(ChatId::new(12)))
        );
        assert_eq!(
            Command::parse("/fork 7").ok(),
            Some(Command::Fork(MessageId::new(7)))
        );
        assert_eq!(Command::parse("/exit").ok(), Some(Command::Quit));
    }

    #[test]
    fn malformed_commands_are_explained() {
        assert!(matches!(
            Command::parse("/open"),
            Err(CommandError::MissingArgument { command: "open", .. })
        ));
        assert!(matches!(
            Command::parse("/fork abc"),
            Err(CommandError::BadId { .. })
        ));
        assert!(matches!(
            Command::parse("/bogus"),
            Err(CommandError::Unknown { .. })
        ));
    }
}
