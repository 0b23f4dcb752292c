mod command;
mod render;

use std::io::Write as _;
use std::sync::Arc;

use espresso_chat::{ChatSlot, ChatSnapshot, ChatStore, SendOutcome, Settings, SettingsError};
use espresso_client::{ClientError, HttpChatBackend, SessionCredentials};
use snafu::{ResultExt, Snafu};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::command::{Command, HELP};
use crate::render::{RevealPrinter, chat_list, describe_error, transcript};

const API_KEY_ENV: &str = "ESPRESSO_API_KEY";

#[derive(Debug, Snafu)]
enum ConsoleError {
    #[snafu(display("failed to load settings"))]
    LoadSettings { source: SettingsError },
    #[snafu(display("failed to build the backend client"))]
    BuildBackend { source: ClientError },
    #[snafu(display("failed to read from stdin"))]
    ReadInput { source: std::io::Error },
}

type Input = Lines<BufReader<Stdin>>;

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), ConsoleError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::load().context(LoadSettingsSnafu)?;
    tracing::info!(base_url = %settings.backend.base_url, "starting espresso console");

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let credentials = SessionCredentials::new();
    if let Ok(api_key) = std::env::var(API_KEY_ENV) {
        credentials.set_api_key(api_key);
    }
    if !credentials.is_authenticated() && !prompt_api_key(&credentials, &mut input).await? {
        return Ok(());
    }

    let backend = HttpChatBackend::new(settings.client_config(), credentials.clone())
        .context(BuildBackendSnafu)?;
    let store = ChatStore::new(Arc::new(backend), settings.store_settings());
    tokio::spawn(print_reveals(store.subscribe()));

    store.load_chats().await;
    println!("{}", chat_list(&store.snapshot()));
    println!("type /help for commands");

    loop {
        let Some(line) = input.next_line().await.context(ReadInputSnafu)? else {
            break;
        };

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(error) => {
                println!("{error}");
                continue;
            }
        };

        match command {
            Command::Nothing => {}
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
            Command::Chats => {
                store.load_chats().await;
                println!("{}", chat_list(&store.snapshot()));
            }
            Command::Open(chat_id) => match store.load_chat(chat_id).await {
                Ok(()) => print_slot(&store, ChatSlot::Primary),
                Err(error) => println!("{}", describe_error(&error)),
            },
            Command::New => match store.start_new_chat().await {
                Ok(chat_id) => println!("started chat {chat_id}"),
                Err(error) => println!("{}", describe_error(&error)),
            },
            Command::Fork(message_id) => match store.open_fork(message_id).await {
                Ok(()) if store.snapshot().has_secondary() => {
                    print_slot(&store, ChatSlot::Secondary);
                }
                Ok(()) => println!("open a chat first"),
                Err(error) => println!("{}", describe_error(&error)),
            },
            Command::Close => {
                store.close_secondary();
                println!("back to the main chat");
            }
            Command::End => {
                credentials.clear();
                store.reset();
                println!("session ended");
                if !prompt_api_key(&credentials, &mut input).await? {
                    break;
                }
                store.load_chats().await;
                println!("{}", chat_list(&store.snapshot()));
            }
            Command::Say(text) => send(&store, text),
        }
    }

    Ok(())
}

/// Asks until a non-blank key is entered. Returns `false` on end of input.
async fn prompt_api_key(
    credentials: &SessionCredentials,
    input: &mut Input,
) -> Result<bool, ConsoleError> {
    loop {
        print!("API key: ");
        let _ = std::io::stdout().flush();
        let Some(line) = input.next_line().await.context(ReadInputSnafu)? else {
            return Ok(false);
        };
        if credentials.set_api_key(&line) {
            return Ok(true);
        }
        println!("the key cannot be blank");
    }
}

fn send(store: &ChatStore, text: String) {
    let snapshot = store.snapshot();
    let slot = if snapshot.has_secondary() {
        ChatSlot::Secondary
    } else {
        ChatSlot::Primary
    };
    if snapshot.chat(slot).is_none() {
        println!("open a chat with /open or start one with /new");
        return;
    }
    if snapshot.is_busy(slot) {
        println!("still waiting for the previous reply");
        return;
    }

    let store = store.clone();
    tokio::spawn(async move {
        let result = match slot {
            ChatSlot::Primary => store.send_primary_message(text).await,
            ChatSlot::Secondary => store.send_secondary_message(text).await,
        };
        match result {
            Ok(SendOutcome::Degenerate) => {
                let reply = store
                    .snapshot()
                    .chat(slot)
                    .and_then(|chat| chat.last_message())
                    .map(|message| message.text().to_string());
                println!("{}", reply.unwrap_or_default());
            }
            Ok(outcome) => tracing::debug!(%slot, ?outcome, "send finished"),
            Err(error) => println!("{}", describe_error(&error)),
        }
    });
}

fn print_slot(store: &ChatStore, slot: ChatSlot) {
    if let Some(chat) = store.snapshot().chat(slot) {
        print!("{}", transcript(chat, slot));
        let _ = std::io::stdout().flush();
    }
}

async fn print_reveals(mut changes: watch::Receiver<ChatSnapshot>) {
    let mut printer = RevealPrinter::default();
    while changes.changed().await.is_ok() {
        let snapshot = changes.borrow_and_update().clone();
        let output = printer.observe(&snapshot);
        if !output.is_empty() {
            print!("{output}");
            let _ = std::io::stdout().flush();
        }
    }
}
