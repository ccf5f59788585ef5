use crate::{
    domain::chat::{ChatId, ChatSummary},
    usecases::contracts::{ChatSource, ChatSourceError},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadSnapshotError {
    #[error("not authorized to list chats")]
    Auth,
    #[error("chat list is temporarily unavailable")]
    Network,
    #[error("chat list payload violates the data contract")]
    DataContractViolation,
}

/// Fetches the authoritative chat list. Errors are surfaced, never retried.
pub fn load_snapshot(source: &dyn ChatSource) -> Result<Vec<ChatSummary>, LoadSnapshotError> {
    source.list_chats().map_err(map_source_error)
}

pub(crate) fn map_source_error(error: ChatSourceError) -> LoadSnapshotError {
    match error {
        ChatSourceError::Unauthorized => LoadSnapshotError::Auth,
        ChatSourceError::Unavailable => LoadSnapshotError::Network,
        ChatSourceError::NotFound | ChatSourceError::InvalidData => {
            LoadSnapshotError::DataContractViolation
        }
    }
}

/// Fetches a single chat referenced by a realtime event.
///
/// A missing chat is not an error for discovery: `Ok(None)` tells the caller
/// to drop the event quietly.
pub fn discover_chat(
    source: &dyn ChatSource,
    chat_id: &ChatId,
) -> Result<Option<ChatSummary>, ChatSourceError> {
    match source.fetch_chat(chat_id) {
        Ok(chat) => Ok(Some(chat)),
        Err(ChatSourceError::NotFound) => Ok(None),
        Err(error) => Err(error),
    }
}
