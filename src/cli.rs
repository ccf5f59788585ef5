use std::{path::PathBuf, str::FromStr};

use clap::{Parser, Subcommand};

use crate::domain::{chat::ChatId, chat_view::ChatView};

#[derive(Debug, Parser)]
#[command(name = "livechat", about = "Live chat list that follows the chat backend")]
pub struct Cli {
    /// Path to config file (default: ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print one snapshot of a chat list tab
    View {
        /// primary, groups, favorites, archived or social:<origin>
        #[arg(short, long, default_value = "primary")]
        tab: ChatView,
    },
    /// List connected apps with their unread totals
    Apps,
    /// Keep the chat list live and reprint it on every change.
    /// Reads `focus <id>`, `unfocus`, `open <id>` and `refresh` from stdin.
    Watch {
        #[arg(short, long, default_value = "primary")]
        tab: ChatView,

        /// Chat the user is currently reading
        #[arg(long)]
        focus: Option<ChatId>,

        /// Chat to open once it shows up in the list
        #[arg(long)]
        open: Option<ChatId>,
    },
}

impl Cli {
    pub fn command_or_default(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::View { tab: ChatView::Primary })
    }
}

/// A line typed while `watch` is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchInput {
    Focus(ChatId),
    Unfocus,
    Open(ChatId),
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchInputError {
    #[error("unknown watch command '{0}'")]
    Unknown(String),
    #[error("'{0}' needs a chat id")]
    MissingChatId(&'static str),
}

impl FromStr for WatchInput {
    type Err = WatchInputError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default();
        let chat_id = words.next().map(ChatId::from);

        match (verb, chat_id) {
            ("focus", Some(chat_id)) => Ok(Self::Focus(chat_id)),
            ("focus", None) => Err(WatchInputError::MissingChatId("focus")),
            ("open", Some(chat_id)) => Ok(Self::Open(chat_id)),
            ("open", None) => Err(WatchInputError::MissingChatId("open")),
            ("unfocus", _) => Ok(Self::Unfocus),
            ("refresh", _) => Ok(Self::Refresh),
            (other, _) => Err(WatchInputError::Unknown(other.to_owned())),
        }
    }
}
