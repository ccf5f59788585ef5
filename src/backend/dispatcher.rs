use std::sync::mpsc::Sender;

use tokio::runtime::Handle;

use crate::{
    domain::chat::ChatId,
    usecases::{
        contracts::{ChatSource, RequestDispatcher, StoreCommand},
        load_snapshot,
    },
};

const DISPATCH_REPLY_DROPPED: &str = "BACKEND_DISPATCH_REPLY_DROPPED";

/// Runs blocking backend requests on the runtime's blocking pool and posts
/// their results back to the chat list command channel.
pub struct RuntimeDispatcher<S> {
    handle: Handle,
    source: S,
}

impl<S> RuntimeDispatcher<S>
where
    S: ChatSource + Clone + Send + 'static,
{
    pub fn new(handle: Handle, source: S) -> Self {
        Self { handle, source }
    }
}

impl<S> RequestDispatcher for RuntimeDispatcher<S>
where
    S: ChatSource + Clone + Send + 'static,
{
    fn fetch_chat(&self, chat_id: ChatId, reply: Sender<StoreCommand>) {
        let source = self.source.clone();
        self.handle.spawn_blocking(move || {
            let result = load_snapshot::discover_chat(&source, &chat_id);
            send_reply(&reply, StoreCommand::ChatFetched { chat_id, result });
        });
    }

    fn reload(&self, reply: Sender<StoreCommand>) {
        let source = self.source.clone();
        self.handle.spawn_blocking(move || {
            let result = source.list_chats();
            send_reply(&reply, StoreCommand::SnapshotLoaded(result));
        });
    }
}

fn send_reply(reply: &Sender<StoreCommand>, command: StoreCommand) {
    let kind = command.kind();
    if reply.send(command).is_err() {
        tracing::debug!(
            code = DISPATCH_REPLY_DROPPED,
            command = kind,
            "chat list is gone; dropping backend reply"
        );
    }
}
