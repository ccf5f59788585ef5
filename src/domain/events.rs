use super::chat::{ChatId, IncomingMessage, UserId};

/// Realtime events delivered by the backend event bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    NewMessage(IncomingMessage),
    Pinned(ChatId),
    Unpinned(ChatId),
    UnreadReset { chat_id: ChatId, for_user: UserId },
}

impl ChatEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewMessage(_) => "new_message",
            Self::Pinned(_) => "pinned",
            Self::Unpinned(_) => "unpinned",
            Self::UnreadReset { .. } => "unread_reset",
        }
    }

    pub fn chat_id(&self) -> &ChatId {
        match self {
            Self::NewMessage(message) => &message.chat_id,
            Self::Pinned(chat_id) | Self::Unpinned(chat_id) => chat_id,
            Self::UnreadReset { chat_id, .. } => chat_id,
        }
    }
}

