use std::{cell::RefCell, collections::HashMap, sync::mpsc::Sender};

use crate::{
    domain::chat::{ChatId, ChatSummary, ConnectedApp},
    usecases::contracts::{ChatSource, ChatSourceError, RequestDispatcher, StoreCommand},
};

#[derive(Debug)]
pub struct StubChatSource {
    pub snapshot: Result<Vec<ChatSummary>, ChatSourceError>,
    pub chats: HashMap<ChatId, ChatSummary>,
    pub self_chat: Result<ChatSummary, ChatSourceError>,
    pub apps: Result<Vec<ConnectedApp>, ChatSourceError>,
    pub list_calls: RefCell<usize>,
    pub open_self_calls: RefCell<usize>,
}

impl StubChatSource {
    pub fn with_snapshot(snapshot: Result<Vec<ChatSummary>, ChatSourceError>) -> Self {
        Self {
            snapshot,
            chats: HashMap::new(),
            self_chat: Err(ChatSourceError::Unavailable),
            apps: Ok(Vec::new()),
            list_calls: RefCell::new(0),
            open_self_calls: RefCell::new(0),
        }
    }
}

impl ChatSource for StubChatSource {
    fn list_chats(&self) -> Result<Vec<ChatSummary>, ChatSourceError> {
        *self.list_calls.borrow_mut() += 1;
        self.snapshot.clone()
    }

    fn fetch_chat(&self, chat_id: &ChatId) -> Result<ChatSummary, ChatSourceError> {
        self.chats
            .get(chat_id)
            .cloned()
            .ok_or(ChatSourceError::NotFound)
    }

    fn open_self_chat(&self) -> Result<ChatSummary, ChatSourceError> {
        *self.open_self_calls.borrow_mut() += 1;
        self.self_chat.clone()
    }

    fn list_connected_apps(&self) -> Result<Vec<ConnectedApp>, ChatSourceError> {
        self.apps.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchedRequest {
    FetchChat(ChatId),
    Reload,
}

/// Records requests instead of running them, so tests decide when and in
/// which order results arrive.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    pub requests: RefCell<Vec<DispatchedRequest>>,
}

impl RecordingDispatcher {
    pub fn take(&self) -> Vec<DispatchedRequest> {
        self.requests.borrow_mut().drain(..).collect()
    }
}

impl RequestDispatcher for RecordingDispatcher {
    fn fetch_chat(&self, chat_id: ChatId, _reply: Sender<StoreCommand>) {
        self.requests
            .borrow_mut()
            .push(DispatchedRequest::FetchChat(chat_id));
    }

    fn reload(&self, _reply: Sender<StoreCommand>) {
        self.requests.borrow_mut().push(DispatchedRequest::Reload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_source_reports_missing_chats_as_not_found() {
        let source = StubChatSource::with_snapshot(Ok(vec![]));

        let err = source
            .fetch_chat(&ChatId::from("ghost"))
            .expect_err("unknown chat must fail");

        assert_eq!(err, ChatSourceError::NotFound);
    }
}
