use tracing::info;

use crate::{domain::Message, ports::MessageHandler, validation::mask_phone_number, Result};

pub const PONG: &str = "🏓 Pong!";
pub const ECHO_PROMPT: &str = "Please provide a message to echo!";

/// A prefixed command split into its name and positional arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    /// Lower-cased.
    pub name: String,
    pub args: Vec<&'a str>,
}

/// Strip `prefix` and split on whitespace runs.
///
/// `None` when the text is not a command or nothing follows the prefix.
pub fn parse_command<'a>(prefix: &str, text: &'a str) -> Option<ParsedCommand<'a>> {
    let rest = text.strip_prefix(prefix)?;
    let mut parts = rest.split_whitespace();
    let name = parts.next()?.to_lowercase();
    Some(ParsedCommand {
        name,
        args: parts.collect(),
    })
}

/// Maps `<prefix><command> [args...]` to a reply string.
#[derive(Clone, Debug)]
pub struct CommandDispatcher {
    prefix: String,
}

impl CommandDispatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Reply for `text`, or `None` for ordinary conversation.
    pub fn reply_to(&self, text: &str) -> Option<String> {
        let cmd = parse_command(&self.prefix, text)?;
        let reply = match cmd.name.as_str() {
            "help" => self.help(),
            "ping" => PONG.to_string(),
            "echo" => echo(&cmd.args),
            "about" => about(),
            other => self.unknown(other),
        };
        Some(reply)
    }

    fn help(&self) -> String {
        let p = &self.prefix;
        format!(
            "Available commands:\n\
             {p}help - Show this help message\n\
             {p}ping - Check if bot is alive\n\
             {p}echo <text> - Echo back your message\n\
             {p}about - Information about this bot"
        )
    }

    fn unknown(&self, name: &str) -> String {
        format!(
            "Unknown command: {name}\nType {}help for available commands",
            self.prefix
        )
    }
}

impl MessageHandler for CommandDispatcher {
    fn handle(&self, msg: &Message) -> Result<Option<String>> {
        Ok(self.reply_to(msg.text()))
    }
}

fn echo(args: &[&str]) -> String {
    if args.is_empty() {
        return ECHO_PROMPT.to_string();
    }
    args.join(" ")
}

fn about() -> String {
    format!(
        "Signal Bot v{}\nA small command bot for Signal, driven by signal-cli",
        env!("CARGO_PKG_VERSION")
    )
}

/// Log an inbound message. The sender is always masked.
pub fn log_message(msg: &Message) {
    let sender = mask_phone_number(msg.sender());
    match msg.group_id() {
        Some(group) => info!("[Group: {group}] {sender}: {}", msg.text()),
        None => info!("[Direct] {sender}: {}", msg.text()),
    }
}
