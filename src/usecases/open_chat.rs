use crate::{
    domain::{chat::ChatId, chat_list_state::ChatListState},
    usecases::contracts::{ChatSource, ChatSourceError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenChatOutcome {
    Focused(ChatId),
    /// The synthetic self-chat was turned into a real server chat.
    Materialized(ChatId),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpenChatError {
    #[error("not authorized to open the self-chat")]
    Auth,
    #[error("self-chat could not be created right now")]
    Network,
    #[error("backend returned an unusable self-chat")]
    DataContractViolation,
}

/// Handles the UI "open chat" action.
pub fn open_chat(
    state: &mut ChatListState,
    source: &dyn ChatSource,
    chat_id: &ChatId,
) -> Result<OpenChatOutcome, OpenChatError> {
    if !chat_id.is_synthetic_self_chat() {
        return Ok(if state.set_focus(chat_id) {
            OpenChatOutcome::Focused(chat_id.clone())
        } else {
            OpenChatOutcome::NotFound
        });
    }

    // The placeholder can be stale if a real self-chat arrived after it was rendered.
    let existing = state
        .chats()
        .iter()
        .find(|chat| chat.is_self_chat)
        .map(|chat| chat.id.clone());
    if let Some(existing) = existing {
        state.set_focus(&existing);
        return Ok(OpenChatOutcome::Focused(existing));
    }

    let mut self_chat = source.open_self_chat().map_err(map_source_error)?;
    if self_chat.id.is_synthetic_self_chat() {
        return Err(OpenChatError::DataContractViolation);
    }
    self_chat.is_self_chat = true;
    self_chat.is_synthetic = false;

    let chat_id = self_chat.id.clone();
    state.upsert(self_chat);
    state.set_focus(&chat_id);

    tracing::info!(chat_id = %chat_id, "self-chat materialized");
    Ok(OpenChatOutcome::Materialized(chat_id))
}

fn map_source_error(error: ChatSourceError) -> OpenChatError {
    match error {
        ChatSourceError::Unauthorized => OpenChatError::Auth,
        ChatSourceError::Unavailable | ChatSourceError::NotFound => OpenChatError::Network,
        ChatSourceError::InvalidData => OpenChatError::DataContractViolation,
    }
}
