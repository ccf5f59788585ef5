use std::collections::{hash_map::Entry, HashMap, HashSet};

use super::{
    chat::{ChatId, ChatSummary, IncomingMessage, PeerSummary, UserId},
    chat_view::{self, ChatView},
    events::ChatEvent,
};

/// What the collection did with a realtime event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    /// The event referenced a chat that is not (or no longer) relevant.
    Ignored,
    /// The chat is unknown; the caller must fetch it and hand it to
    /// [`ChatListState::insert_discovered`].
    DiscoveryRequested(ChatId),
    /// The chat is unknown but a fetch for it is already in flight.
    DiscoveryPending,
}

/// Messages received for a chat whose detail fetch has not resolved yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PendingDiscovery {
    latest: Option<IncomingMessage>,
    unread_increments: u32,
}

impl PendingDiscovery {
    fn record(&mut self, message: IncomingMessage, counts_as_unread: bool) {
        if counts_as_unread {
            self.unread_increments = self.unread_increments.saturating_add(1);
        }

        let is_newer = self
            .latest
            .as_ref()
            .is_none_or(|latest| message.sent_at_unix_ms >= latest.sent_at_unix_ms);
        if is_newer {
            self.latest = Some(message);
        }
    }

    fn fold_into(self, chat: &mut ChatSummary) {
        if let Some(latest) = self.latest {
            let is_newer = chat
                .last_at_unix_ms
                .is_none_or(|at| latest.sent_at_unix_ms >= at);
            if is_newer {
                chat.last_message = latest.preview();
                chat.last_at_unix_ms = Some(latest.sent_at_unix_ms);
            }
        }
        chat.unread = chat.unread.max(self.unread_increments);
    }
}

/// The live chat collection: a single owner for every mutation, kept
/// deduplicated by id and sorted by [`chat_view::compare_chats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatListState {
    local_user: UserId,
    chats: Vec<ChatSummary>,
    focused: Option<ChatId>,
    pending_deep_link: Option<ChatId>,
    discoveries: HashMap<ChatId, PendingDiscovery>,
}

impl ChatListState {
    pub fn new(local_user: UserId) -> Self {
        Self {
            local_user,
            chats: Vec::new(),
            focused: None,
            pending_deep_link: None,
            discoveries: HashMap::new(),
        }
    }

    pub fn local_user(&self) -> &UserId {
        &self.local_user
    }

    pub fn chats(&self) -> &[ChatSummary] {
        &self.chats
    }

    pub fn get(&self, chat_id: &ChatId) -> Option<&ChatSummary> {
        self.chats.iter().find(|chat| chat.id == *chat_id)
    }

    pub fn contains(&self, chat_id: &ChatId) -> bool {
        self.get(chat_id).is_some()
    }

    #[cfg(test)]
    pub fn unread(&self, chat_id: &ChatId) -> Option<u32> {
        self.get(chat_id).map(|chat| chat.unread)
    }

    pub fn focused(&self) -> Option<&ChatId> {
        self.focused.as_ref()
    }

    #[cfg(test)]
    pub fn is_discovering(&self, chat_id: &ChatId) -> bool {
        self.discoveries.contains_key(chat_id)
    }

    /// Remembers a chat to open as soon as a snapshot makes it resolvable.
    pub fn set_pending_deep_link(&mut self, chat_id: ChatId) {
        self.pending_deep_link = Some(chat_id);
    }

    #[cfg(test)]
    pub fn pending_deep_link(&self) -> Option<&ChatId> {
        self.pending_deep_link.as_ref()
    }

    /// Replaces the collection with a server snapshot.
    ///
    /// Unread counts never drop below what was accumulated locally, and a chat
    /// whose local activity is newer than the snapshot keeps its last message.
    /// Returns the pending deep link if the snapshot resolved it; the link is
    /// cleared so it is reported only once.
    pub fn merge_snapshot(&mut self, snapshot: Vec<ChatSummary>) -> Option<ChatId> {
        let mut previous: HashMap<ChatId, ChatSummary> = self
            .chats
            .drain(..)
            .map(|chat| (chat.id.clone(), chat))
            .collect();
        let mut seen = HashSet::with_capacity(snapshot.len());
        let mut merged = Vec::with_capacity(snapshot.len());

        for mut chat in snapshot {
            if chat.is_synthetic {
                continue;
            }
            if !seen.insert(chat.id.clone()) {
                tracing::warn!(chat_id = %chat.id, "duplicate chat in snapshot dropped");
                continue;
            }

            if let Some(local) = previous.remove(&chat.id) {
                merge_local_into(&mut chat, local);
            }
            if let Some(pending) = self.discoveries.remove(&chat.id) {
                pending.fold_into(&mut chat);
            }
            if self.focused.as_ref() == Some(&chat.id) {
                chat.unread = 0;
            }
            merged.push(chat);
        }

        self.chats = merged;
        self.sort();

        let resolved = self
            .pending_deep_link
            .as_ref()
            .is_some_and(|chat_id| self.contains(chat_id));
        if resolved {
            self.pending_deep_link.take()
        } else {
            None
        }
    }

    pub fn apply_event(&mut self, event: ChatEvent) -> EventOutcome {
        match event {
            ChatEvent::NewMessage(message) => self.apply_new_message(message),
            ChatEvent::Pinned(chat_id) => self.set_pinned(&chat_id, true),
            ChatEvent::Unpinned(chat_id) => self.set_pinned(&chat_id, false),
            ChatEvent::UnreadReset { chat_id, for_user } => {
                if for_user != self.local_user {
                    return EventOutcome::Ignored;
                }
                match self.get_mut(&chat_id) {
                    Some(chat) => {
                        chat.unread = 0;
                        EventOutcome::Applied
                    }
                    None => EventOutcome::Ignored,
                }
            }
        }
    }

    /// Inserts a chat fetched after discovery, unless it arrived meanwhile.
    pub fn insert_discovered(&mut self, mut chat: ChatSummary) -> bool {
        let pending = self.discoveries.remove(&chat.id);
        if self.contains(&chat.id) {
            tracing::debug!(chat_id = %chat.id, "discovered chat already present; skipping insert");
            return false;
        }

        if let Some(pending) = pending {
            pending.fold_into(&mut chat);
        }
        if self.focused.as_ref() == Some(&chat.id) {
            chat.unread = 0;
        }
        self.chats.push(chat);
        self.sort();
        true
    }

    /// Forgets an in-flight discovery so a later message can trigger a new fetch.
    pub fn discovery_failed(&mut self, chat_id: &ChatId) {
        self.discoveries.remove(chat_id);
    }

    /// Inserts or replaces a chat record obtained outside the snapshot flow.
    pub fn upsert(&mut self, mut chat: ChatSummary) {
        if let Some(pending) = self.discoveries.remove(&chat.id) {
            pending.fold_into(&mut chat);
        }

        match self.chats.iter().position(|existing| existing.id == chat.id) {
            Some(index) => {
                let local = std::mem::replace(&mut self.chats[index], chat);
                merge_local_into(&mut self.chats[index], local);
            }
            None => self.chats.push(chat),
        }

        if let Some(focused) = self.focused.clone() {
            if let Some(chat) = self.get_mut(&focused) {
                chat.unread = 0;
            }
        }
        self.sort();
    }

    /// Focuses a known chat and zeroes its unread count. Unknown ids are ignored.
    pub fn set_focus(&mut self, chat_id: &ChatId) -> bool {
        let Some(chat) = self.get_mut(chat_id) else {
            return false;
        };

        chat.unread = 0;
        self.focused = Some(chat_id.clone());
        true
    }

    /// Returns whether a chat was focused.
    pub fn clear_focus(&mut self) -> bool {
        self.focused.take().is_some()
    }

    pub fn view(&self, view: &ChatView) -> Vec<ChatSummary> {
        chat_view::build_view(&self.chats, view, &self.local_user)
    }

    pub fn total_unread(&self, view: &ChatView) -> u32 {
        self.total_unread_where(|chat| view.includes(chat))
    }

    pub fn total_unread_where<P>(&self, predicate: P) -> u32
    where
        P: Fn(&ChatSummary) -> bool,
    {
        self.chats
            .iter()
            .filter(|chat| predicate(chat))
            .fold(0u32, |total, chat| total.saturating_add(chat.unread))
    }

    pub fn online_peers(&self) -> Vec<PeerSummary> {
        chat_view::online_peers(&self.chats, &self.local_user)
    }

    fn apply_new_message(&mut self, message: IncomingMessage) -> EventOutcome {
        let counts_as_unread =
            !message.is_from(&self.local_user) && self.focused.as_ref() != Some(&message.chat_id);

        let Some(chat) = self.get_mut(&message.chat_id) else {
            return match self.discoveries.entry(message.chat_id.clone()) {
                Entry::Vacant(entry) => {
                    let chat_id = entry.key().clone();
                    entry.insert(PendingDiscovery::default()).record(message, counts_as_unread);
                    EventOutcome::DiscoveryRequested(chat_id)
                }
                Entry::Occupied(mut entry) => {
                    entry.get_mut().record(message, counts_as_unread);
                    EventOutcome::DiscoveryPending
                }
            };
        };

        // Late deliveries still count as unread but never rewind the preview.
        if chat.last_at_unix_ms.is_none_or(|at| message.sent_at_unix_ms >= at) {
            chat.last_message = message.preview();
            chat.last_at_unix_ms = Some(message.sent_at_unix_ms);
        }
        if counts_as_unread {
            chat.unread = chat.unread.saturating_add(1);
        }

        self.sort();
        EventOutcome::Applied
    }

    fn set_pinned(&mut self, chat_id: &ChatId, pinned: bool) -> EventOutcome {
        let Some(chat) = self.get_mut(chat_id) else {
            return EventOutcome::Ignored;
        };

        chat.is_pinned = pinned;
        self.sort();
        EventOutcome::Applied
    }

    fn get_mut(&mut self, chat_id: &ChatId) -> Option<&mut ChatSummary> {
        self.chats.iter_mut().find(|chat| chat.id == *chat_id)
    }

    fn sort(&mut self) {
        chat_view::sort_chats(&mut self.chats, &self.local_user);
    }
}

fn merge_local_into(chat: &mut ChatSummary, local: ChatSummary) {
    chat.unread = chat.unread.max(local.unread);

    let local_is_newer = match (local.last_at_unix_ms, chat.last_at_unix_ms) {
        (Some(local_at), Some(server_at)) => local_at > server_at,
        (Some(_), None) => true,
        _ => false,
    };
    if local_is_newer {
        chat.last_message = local.last_message;
        chat.last_at_unix_ms = local.last_at_unix_ms;
    }
}
