use crate::conversation::{ ConversationError, ConversationManager, ConversationSnapshot };
use crate::models::api::HealthStatus;
use crate::models::chat::{ Chat, Message, Role };
use log::{ debug, info, warn };
use std::error::Error;
use std::io::Write;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::Arc;
use tokio::io::{ AsyncBufReadExt, BufReader };

const HELP: &str = "Commands: /reset clears the conversation, /health checks the backend, \
/history reprints the conversation, /quit exits. Anything else is sent as a message.";

#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Send(&'a str),
    Reset,
    Health,
    History,
    Help,
    Quit,
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Self {
        match line.trim() {
            "/reset" => Command::Reset,
            "/health" => Command::Health,
            "/history" => Command::History,
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            _ => Command::Send(line),
        }
    }
}

pub fn format_message(message: &Message) -> String {
    let speaker = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    let mut line = format!("{}> {}", speaker, message.content);

    if message.is_error() {
        line.push_str(" [failed]");
    } else if let Some(metadata) = &message.metadata {
        let mut details = Vec::new();
        if let Some(sources) = metadata.sources.as_ref().filter(|s| !s.is_empty()) {
            details.push(format!("{} sources", sources.len()));
        }
        if let Some(seconds) = metadata.processing_time {
            details.push(format!("{:.2}s", seconds));
        }
        if !details.is_empty() {
            line.push_str(&format!(" [{}]", details.join(", ")));
        }
    }
    line
}

pub fn format_health(health: &HealthStatus) -> String {
    let state = if health.online { "online" } else { "offline" };
    match &health.message {
        Some(message) => format!("backend {}: {}", state, message),
        None => format!("backend {}", state),
    }
}

/// Prints messages appended since the last call; a shrunk list means a reset.
fn render(snapshot: &ConversationSnapshot, printed: &AtomicUsize) {
    let already = printed.load(Ordering::SeqCst);
    if snapshot.messages.len() < already {
        println!("-- conversation cleared --");
    }
    let start = if snapshot.messages.len() < already { 0 } else { already };
    for message in &snapshot.messages[start..] {
        if message.role == Role::Assistant {
            println!("{}", format_message(message));
        }
    }
    printed.store(snapshot.messages.len(), Ordering::SeqCst);
}

fn print_history(messages: &[Message]) {
    for message in messages {
        println!("{}", format_message(message));
    }
}

fn report(manager: &ConversationManager, result: Result<(), ConversationError>) {
    if let Err(e) = result {
        println!("! {}", e);
        return;
    }
    if let Some(error) = manager.error() {
        println!("! {}", error);
    }
}

/// A conversation starting with `text` gets a title; blank input starts nothing.
pub fn opening_chat(messages: &[Message], text: &str) -> Option<Chat> {
    if !messages.is_empty() || text.trim().is_empty() {
        return None;
    }
    Some(Chat::from_first_message(text))
}

fn prompt() {
    print!("> ");
    if let Err(e) = std::io::stdout().flush() {
        debug!("Failed to flush prompt: {}", e);
    }
}

pub async fn run_repl(manager: ConversationManager) -> Result<(), Box<dyn Error + Send + Sync>> {
    let history = manager.messages();
    print_history(&history);
    println!("{}", HELP);

    let printed = Arc::new(AtomicUsize::new(history.len()));
    let subscription = {
        let printed = printed.clone();
        manager.subscribe(move |snapshot| render(snapshot, &printed))
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Quit => break,
            Command::Reset => report(&manager, manager.reset().await),
            Command::Health => println!("{}", format_health(&manager.check_health().await)),
            Command::History => print_history(&manager.messages()),
            Command::Help => println!("{}", HELP),
            Command::Send(text) => {
                if let Some(chat) = opening_chat(&manager.messages(), text) {
                    info!("Started chat {}", chat.id);
                    println!("-- {} --", chat.title);
                }
                report(&manager, manager.send_message(text).await)
            }
        }
        prompt();
    }

    if !manager.unsubscribe(subscription) {
        warn!("Renderer subscription was already removed");
    }
    info!("Chat session ended");
    Ok(())
}
