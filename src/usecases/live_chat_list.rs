use std::{
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    time::Duration,
};

use crate::{
    domain::{
        chat::{ChatId, ChatSummary, PeerSummary, UserId},
        chat_list_state::{ChatListState, EventOutcome},
        chat_view::ChatView,
        events::ChatEvent,
    },
    usecases::{
        connected_apps::{self, AppBadge},
        contracts::{ChatListNotice, ChatSource, ChatSourceError, RequestDispatcher, StoreCommand},
        load_snapshot::{self, LoadSnapshotError},
        open_chat::{self, OpenChatError, OpenChatOutcome},
    },
};

const CHAT_LIST_SNAPSHOT_APPLIED: &str = "CHAT_LIST_SNAPSHOT_APPLIED";
const CHAT_LIST_REFRESH_FAILED: &str = "CHAT_LIST_REFRESH_FAILED";
const CHAT_LIST_DISCOVERY_REQUESTED: &str = "CHAT_LIST_DISCOVERY_REQUESTED";
const CHAT_LIST_DISCOVERY_FAILED: &str = "CHAT_LIST_DISCOVERY_FAILED";
const CHAT_LIST_DISCOVERY_NOT_FOUND: &str = "CHAT_LIST_DISCOVERY_NOT_FOUND";
const CHAT_LIST_DEEP_LINK_RESOLVED: &str = "CHAT_LIST_DEEP_LINK_RESOLVED";

/// Owns the chat collection and applies every command in submission order.
///
/// Realtime events, UI signals and the results of background requests all
/// arrive through one channel, so late responses are checked against the
/// state they land on rather than the state they were requested from.
pub struct LiveChatList<S, D>
where
    S: ChatSource,
    D: RequestDispatcher,
{
    state: ChatListState,
    source: S,
    dispatcher: D,
    commands_tx: Sender<StoreCommand>,
    commands_rx: Receiver<StoreCommand>,
    subscribers: Vec<Sender<ChatListNotice>>,
}

impl<S, D> LiveChatList<S, D>
where
    S: ChatSource,
    D: RequestDispatcher,
{
    pub fn new(local_user: UserId, source: S, dispatcher: D) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel();
        Self {
            state: ChatListState::new(local_user),
            source,
            dispatcher,
            commands_tx,
            commands_rx,
            subscribers: Vec::new(),
        }
    }

    pub fn state(&self) -> &ChatListState {
        &self.state
    }

    /// Handle for event producers (realtime monitor, UI) to submit commands.
    pub fn command_sender(&self) -> Sender<StoreCommand> {
        self.commands_tx.clone()
    }

    pub fn subscribe(&mut self) -> Receiver<ChatListNotice> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn set_pending_deep_link(&mut self, chat_id: ChatId) {
        self.state.set_pending_deep_link(chat_id);
    }

    /// Initial snapshot load; failures go back to the caller.
    pub fn load(&mut self) -> Result<usize, LoadSnapshotError> {
        let chats = load_snapshot::load_snapshot(&self.source)?;
        let count = chats.len();
        self.apply_snapshot(chats);
        Ok(count)
    }

    pub fn open_chat(&mut self, chat_id: &ChatId) -> Result<OpenChatOutcome, OpenChatError> {
        let outcome = open_chat::open_chat(&mut self.state, &self.source, chat_id)?;

        match &outcome {
            OpenChatOutcome::Focused(_) => self.notify(ChatListNotice::Changed),
            OpenChatOutcome::Materialized(_) => {
                self.notify(ChatListNotice::Changed);
                self.dispatcher.reload(self.commands_tx.clone());
            }
            OpenChatOutcome::NotFound => {
                tracing::debug!(chat_id = %chat_id, "open requested for unknown chat");
            }
        }

        Ok(outcome)
    }

    /// Applies every command already queued. Returns how many were handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(command) = self.commands_rx.try_recv() {
            self.handle(command);
            handled += 1;
        }
        handled
    }

    /// Waits up to `timeout` for the next command, then drains the queue.
    pub fn wait_and_process(&mut self, timeout: Duration) -> usize {
        match self.commands_rx.recv_timeout(timeout) {
            Ok(command) => {
                self.handle(command);
                1 + self.process_pending()
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => 0,
        }
    }

    pub fn handle(&mut self, command: StoreCommand) {
        tracing::trace!(command = command.kind(), "chat list command");

        match command {
            StoreCommand::Event(event) => {
                tracing::trace!(chat_id = %event.chat_id(), event = event.kind(), "chat event");
                self.apply_event(event);
            }
            StoreCommand::FocusChanged(chat_id) => {
                if self.state.set_focus(&chat_id) {
                    self.notify(ChatListNotice::Changed);
                }
            }
            StoreCommand::FocusCleared => {
                if self.state.clear_focus() {
                    self.notify(ChatListNotice::Changed);
                }
            }
            StoreCommand::RefreshRequested => {
                self.dispatcher.reload(self.commands_tx.clone());
            }
            StoreCommand::SnapshotLoaded(Ok(chats)) => self.apply_snapshot(chats),
            StoreCommand::SnapshotLoaded(Err(error)) => {
                let error = load_snapshot::map_source_error(error);
                tracing::warn!(
                    code = CHAT_LIST_REFRESH_FAILED,
                    error = %error,
                    "chat list refresh failed; keeping current collection"
                );
            }
            StoreCommand::ChatFetched { chat_id, result } => {
                self.apply_fetched_chat(chat_id, result)
            }
        }
    }

    pub fn view(&self, view: &ChatView) -> Vec<ChatSummary> {
        self.state.view(view)
    }

    pub fn total_unread(&self, view: &ChatView) -> u32 {
        self.state.total_unread(view)
    }

    pub fn online_peers(&self) -> Vec<PeerSummary> {
        self.state.online_peers()
    }

    pub fn connected_apps(&self) -> Result<Vec<AppBadge>, LoadSnapshotError> {
        connected_apps::connected_app_badges(&self.source, &self.state)
    }

    fn apply_event(&mut self, event: ChatEvent) {
        match self.state.apply_event(event) {
            EventOutcome::Applied => self.notify(ChatListNotice::Changed),
            EventOutcome::DiscoveryRequested(chat_id) => {
                tracing::debug!(
                    code = CHAT_LIST_DISCOVERY_REQUESTED,
                    chat_id = %chat_id,
                    "message for unknown chat; fetching it"
                );
                self.dispatcher.fetch_chat(chat_id, self.commands_tx.clone());
            }
            EventOutcome::DiscoveryPending | EventOutcome::Ignored => {}
        }
    }

    fn apply_snapshot(&mut self, chats: Vec<ChatSummary>) {
        let count = chats.len();
        let deep_link = self.state.merge_snapshot(chats);
        tracing::debug!(
            code = CHAT_LIST_SNAPSHOT_APPLIED,
            chats = count,
            "chat list snapshot applied"
        );
        self.notify(ChatListNotice::Changed);

        if let Some(chat_id) = deep_link {
            tracing::info!(
                code = CHAT_LIST_DEEP_LINK_RESOLVED,
                chat_id = %chat_id,
                "pending deep link resolved"
            );
            self.notify(ChatListNotice::OpenChatRequested(chat_id));
        }
    }

    fn apply_fetched_chat(
        &mut self,
        chat_id: ChatId,
        result: Result<Option<ChatSummary>, ChatSourceError>,
    ) {
        match result {
            Ok(Some(chat)) => {
                if chat.id != chat_id {
                    tracing::warn!(
                        requested = %chat_id,
                        received = %chat.id,
                        "fetched chat id differs from the requested one"
                    );
                    self.state.discovery_failed(&chat_id);
                }
                if self.state.insert_discovered(chat) {
                    self.notify(ChatListNotice::Changed);
                }
            }
            Ok(None) => {
                tracing::debug!(
                    code = CHAT_LIST_DISCOVERY_NOT_FOUND,
                    chat_id = %chat_id,
                    "discovered chat no longer exists; dropping event"
                );
                self.state.discovery_failed(&chat_id);
            }
            Err(error) => {
                tracing::warn!(
                    code = CHAT_LIST_DISCOVERY_FAILED,
                    chat_id = %chat_id,
                    error = %error,
                    "chat discovery failed; it will appear on next reload"
                );
                self.state.discovery_failed(&chat_id);
            }
        }
    }

    fn notify(&mut self, notice: ChatListNotice) {
        self.subscribers.retain(|sub| sub.send(notice.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::chat::{IncomingMessage, UserRef, SYNTHETIC_SELF_CHAT_ID},
        infra::stubs::{DispatchedRequest, RecordingDispatcher, StubChatSource},
        test_support::dated_chat as chat,
    };

    type TestStore = LiveChatList<StubChatSource, RecordingDispatcher>;

    fn store(snapshot: Vec<ChatSummary>) -> TestStore {
        let mut store = LiveChatList::new(
            UserId::from("me"),
            StubChatSource::with_snapshot(Ok(snapshot)),
            RecordingDispatcher::default(),
        );
        store.load().expect("initial load");
        store
    }

    fn new_message(chat_id: &str, sender: &str, body: &str, at: i64) -> StoreCommand {
        StoreCommand::Event(ChatEvent::NewMessage(IncomingMessage {
            chat_id: ChatId::from(chat_id),
            sender: UserRef::Reference(UserId::from(sender)),
            body: Some(body.to_owned()),
            attachment_count: 0,
            sent_at_unix_ms: at,
        }))
    }

    fn ids(chats: &[ChatSummary]) -> Vec<&str> {
        chats.iter().map(|chat| chat.id.as_str()).collect()
    }

    #[test]
    fn initial_load_errors_reach_the_caller() {
        let mut store = LiveChatList::new(
            UserId::from("me"),
            StubChatSource::with_snapshot(Err(ChatSourceError::Unauthorized)),
            RecordingDispatcher::default(),
        );

        let err = store.load().expect_err("load must fail");

        assert_eq!(err, LoadSnapshotError::Auth);
        assert!(store.state().chats().is_empty());
    }

    #[test]
    fn empty_store_shows_synthetic_self_chat() {
        let store = store(vec![]);

        let primary = store.view(&ChatView::Primary);

        assert_eq!(ids(&primary), vec![SYNTHETIC_SELF_CHAT_ID]);
    }

    #[test]
    fn commands_are_applied_in_submission_order() {
        let mut store = store(vec![chat("a", 10), chat("b", 20)]);
        let sender = store.command_sender();

        sender.send(new_message("a", "peer", "first", 30)).expect("send");
        sender
            .send(StoreCommand::FocusChanged(ChatId::from("a")))
            .expect("send");
        sender.send(new_message("a", "peer", "second", 31)).expect("send");

        assert_eq!(store.process_pending(), 3);
        let a = store.state().get(&ChatId::from("a")).expect("chat a");
        assert_eq!(a.unread, 0);
        assert_eq!(a.last_message, "second");
    }

    #[test]
    fn unknown_chat_message_dispatches_one_fetch_and_inserts_result() {
        let mut store = store(vec![chat("a", 10)]);

        store.handle(new_message("z", "peer", "hello", 50));
        store.handle(new_message("z", "peer", "hello again", 60));

        assert_eq!(
            store.dispatcher.take(),
            vec![DispatchedRequest::FetchChat(ChatId::from("z"))]
        );
        assert!(!store.state().contains(&ChatId::from("z")));

        store
            .command_sender()
            .send(StoreCommand::ChatFetched {
                chat_id: ChatId::from("z"),
                result: Ok(Some(chat("z", 40))),
            })
            .expect("send");
        store.process_pending();

        let z = store.state().get(&ChatId::from("z")).expect("chat z");
        assert_eq!(z.last_message, "hello again");
        assert_eq!(z.last_at_unix_ms, Some(60));
        assert_eq!(z.unread, 2);
        assert_eq!(ids(store.state().chats()), vec!["z", "a"]);
    }

    #[test]
    fn overlapping_discovery_results_converge_to_one_entry() {
        let mut store = store(vec![]);
        store.handle(new_message("z", "peer", "hello", 50));

        let mut stale = chat("z", 1);
        stale.title = "stale".to_owned();
        store.handle(StoreCommand::ChatFetched {
            chat_id: ChatId::from("z"),
            result: Ok(Some(chat("z", 40))),
        });
        store.handle(StoreCommand::ChatFetched {
            chat_id: ChatId::from("z"),
            result: Ok(Some(stale)),
        });

        let matching = store
            .state()
            .chats()
            .iter()
            .filter(|chat| chat.id.as_str() == "z")
            .count();
        assert_eq!(matching, 1);
    }

    #[test]
    fn fetched_record_for_another_id_clears_the_requested_slot() {
        let mut store = store(vec![chat("a", 10)]);
        store.handle(new_message("z", "peer", "hello", 50));
        assert!(store.state().is_discovering(&ChatId::from("z")));

        store.handle(StoreCommand::ChatFetched {
            chat_id: ChatId::from("z"),
            result: Ok(Some(chat("y", 40))),
        });

        assert!(!store.state().is_discovering(&ChatId::from("z")));
        assert!(!store.state().contains(&ChatId::from("z")));
        assert!(store.state().contains(&ChatId::from("y")));

        store.dispatcher.take();
        store.handle(new_message("z", "peer", "retry", 60));
        assert_eq!(
            store.dispatcher.take(),
            vec![DispatchedRequest::FetchChat(ChatId::from("z"))]
        );
    }

    #[test]
    fn fetched_record_for_another_id_is_not_duplicated() {
        let mut store = store(vec![chat("a", 10)]);
        store.handle(new_message("z", "peer", "hello", 50));

        store.handle(StoreCommand::ChatFetched {
            chat_id: ChatId::from("z"),
            result: Ok(Some(chat("a", 1))),
        });

        assert_eq!(ids(store.state().chats()), vec!["a"]);
        assert_eq!(
            store.state().get(&ChatId::from("a")).map(|a| a.last_at_unix_ms),
            Some(Some(10))
        );
    }

    #[test]
    fn focus_cleared_notifies_only_when_something_was_focused() {
        let mut store = store(vec![chat("a", 10)]);
        let notices = store.subscribe();

        store.handle(StoreCommand::FocusCleared);
        store.handle(StoreCommand::FocusChanged(ChatId::from("a")));
        store.handle(StoreCommand::FocusCleared);
        store.handle(new_message("a", "peer", "hi", 20));

        assert_eq!(store.state().focused(), None);
        assert_eq!(store.state().unread(&ChatId::from("a")), Some(1));
        assert_eq!(notices.try_iter().count(), 3);
    }

    #[test]
    fn failed_discovery_is_dropped_without_retry() {
        let mut store = store(vec![chat("a", 10)]);
        store.handle(new_message("z", "peer", "hello", 50));
        store.dispatcher.take();

        store.handle(StoreCommand::ChatFetched {
            chat_id: ChatId::from("z"),
            result: Err(ChatSourceError::Unavailable),
        });

        assert!(store.dispatcher.take().is_empty());
        assert!(!store.state().contains(&ChatId::from("z")));
        assert!(!store.state().is_discovering(&ChatId::from("z")));
    }

    #[test]
    fn not_found_discovery_is_dropped_quietly() {
        let mut store = store(vec![]);
        store.handle(new_message("z", "peer", "hello", 50));

        store.handle(StoreCommand::ChatFetched {
            chat_id: ChatId::from("z"),
            result: Ok(None),
        });

        assert!(store.state().chats().is_empty());
        assert!(!store.state().is_discovering(&ChatId::from("z")));
    }

    #[test]
    fn refresh_request_reloads_and_merges_with_unread_floor() {
        let mut store = store(vec![chat("a", 10)]);
        store.handle(new_message("a", "peer", "one", 11));
        store.handle(new_message("a", "peer", "two", 12));

        store.handle(StoreCommand::RefreshRequested);
        assert_eq!(store.dispatcher.take(), vec![DispatchedRequest::Reload]);

        store.handle(StoreCommand::SnapshotLoaded(Ok(vec![chat("a", 12), chat("b", 5)])));

        assert_eq!(store.state().unread(&ChatId::from("a")), Some(2));
        assert!(store.state().contains(&ChatId::from("b")));
    }

    #[test]
    fn failed_refresh_keeps_collection() {
        let mut store = store(vec![chat("a", 10)]);
        let before = store.state().clone();

        store.handle(StoreCommand::SnapshotLoaded(Err(ChatSourceError::Unavailable)));

        assert_eq!(store.state(), &before);
    }

    #[test]
    fn subscribers_see_changes_and_deep_link_once() {
        let mut store = LiveChatList::new(
            UserId::from("me"),
            StubChatSource::with_snapshot(Ok(vec![chat("a", 10), chat("b", 20)])),
            RecordingDispatcher::default(),
        );
        let notices = store.subscribe();
        store.set_pending_deep_link(ChatId::from("b"));

        store.load().expect("load");
        store.handle(StoreCommand::SnapshotLoaded(Ok(vec![chat("b", 20)])));

        let received: Vec<ChatListNotice> = notices.try_iter().collect();
        assert_eq!(
            received,
            vec![
                ChatListNotice::Changed,
                ChatListNotice::OpenChatRequested(ChatId::from("b")),
                ChatListNotice::Changed,
            ]
        );
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut store = store(vec![chat("a", 10)]);
        drop(store.subscribe());

        store.handle(StoreCommand::Event(ChatEvent::Pinned(ChatId::from("a"))));

        assert!(store.subscribers.is_empty());
    }

    #[test]
    fn materializing_self_chat_requests_refresh() {
        let mut source = StubChatSource::with_snapshot(Ok(vec![]));
        source.self_chat = Ok(ChatSummary::new("self-1"));
        let mut store =
            LiveChatList::new(UserId::from("me"), source, RecordingDispatcher::default());
        store.load().expect("load");

        let outcome = store
            .open_chat(&ChatId::from(SYNTHETIC_SELF_CHAT_ID))
            .expect("open");

        assert_eq!(outcome, OpenChatOutcome::Materialized(ChatId::from("self-1")));
        assert_eq!(store.dispatcher.take(), vec![DispatchedRequest::Reload]);
        assert_eq!(store.view(&ChatView::Primary)[0].id.as_str(), "self-1");
    }

    #[test]
    fn unread_badge_for_connected_app() {
        let mut shop = chat("shop", 10);
        shop.origin = Some("ecommerce".to_owned());
        let mut store = store(vec![shop, chat("native", 5)]);

        store.handle(new_message("shop", "buyer", "is it available?", 20));
        store.handle(new_message("native", "friend", "hey", 21));

        let social = ChatView::Social("ecommerce".to_owned());
        assert_eq!(store.total_unread(&social), 1);
        assert_eq!(ids(&store.view(&social)), vec!["shop"]);
    }

    #[test]
    fn wait_and_process_times_out_when_idle() {
        let mut store = store(vec![]);

        assert_eq!(store.wait_and_process(Duration::from_millis(5)), 0);
    }
}
