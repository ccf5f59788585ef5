use std::sync::mpsc::Sender;

use crate::domain::{
    chat::{ChatId, ChatSummary, ConnectedApp},
    events::ChatEvent,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatSourceError {
    #[error("backend rejected the credential")]
    Unauthorized,
    #[error("backend is unreachable or failed")]
    Unavailable,
    #[error("chat does not exist")]
    NotFound,
    #[error("backend returned data outside the chat contract")]
    InvalidData,
}

/// Backend REST surface for chat summaries.
pub trait ChatSource {
    fn list_chats(&self) -> Result<Vec<ChatSummary>, ChatSourceError>;
    fn fetch_chat(&self, chat_id: &ChatId) -> Result<ChatSummary, ChatSourceError>;
    /// Creates (or returns) the server-side self-chat of the local user.
    fn open_self_chat(&self) -> Result<ChatSummary, ChatSourceError>;
    fn list_connected_apps(&self) -> Result<Vec<ConnectedApp>, ChatSourceError>;
}

/// Commands consumed by the live chat list, strictly in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    Event(ChatEvent),
    FocusChanged(ChatId),
    FocusCleared,
    RefreshRequested,
    SnapshotLoaded(Result<Vec<ChatSummary>, ChatSourceError>),
    ChatFetched {
        chat_id: ChatId,
        /// `Ok(None)` when the backend no longer knows the chat.
        result: Result<Option<ChatSummary>, ChatSourceError>,
    },
}

impl StoreCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Event(event) => event.kind(),
            Self::FocusChanged(_) => "focus_changed",
            Self::FocusCleared => "focus_cleared",
            Self::RefreshRequested => "refresh_requested",
            Self::SnapshotLoaded(_) => "snapshot_loaded",
            Self::ChatFetched { .. } => "chat_fetched",
        }
    }
}

/// Runs backend requests off the command loop; results are posted back as
/// [`StoreCommand::SnapshotLoaded`] and [`StoreCommand::ChatFetched`].
pub trait RequestDispatcher {
    fn fetch_chat(&self, chat_id: ChatId, reply: Sender<StoreCommand>);
    fn reload(&self, reply: Sender<StoreCommand>);
}

/// Change feed for observers of the live chat list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatListNotice {
    Changed,
    OpenChatRequested(ChatId),
}
