use std::{collections::BTreeSet, fmt};

/// Id of the locally fabricated self-chat shortcut.
pub const SYNTHETIC_SELF_CHAT_ID: &str = "me-shortcut";
const SYNTHETIC_SELF_CHAT_TITLE: &str = "Me";
const SYNTHETIC_SELF_CHAT_HINT: &str = "Message yourself to save notes/links";
const ATTACHMENT_PREVIEW: &str = "[attachment]";

/// Opaque chat identifier. Numeric wire ids are normalized to their text form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChatId(String);

impl ChatId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_synthetic_self_chat(&self) -> bool {
        self.0 == SYNTHETIC_SELF_CHAT_ID
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChatId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ChatId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Populated user record as embedded by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub full_name: Option<String>,
}

/// A user reference that the backend may or may not have populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Reference(UserId),
    Populated(UserRecord),
}

impl UserRef {
    pub fn id(&self) -> &UserId {
        match self {
            Self::Reference(id) => id,
            Self::Populated(record) => &record.id,
        }
    }
}

/// The other participant of a 1-to-1 chat.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PeerSummary {
    pub id: UserId,
    pub is_favorite: bool,
    pub is_online: bool,
    pub avatar: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub id: ChatId,
    pub title: String,
    pub is_group: bool,
    pub is_self_chat: bool,
    pub is_archived: bool,
    pub is_announcement_group: bool,
    pub is_pinned: bool,
    /// Users who pinned this chat for themselves.
    pub pinned_by: BTreeSet<UserId>,
    /// Only present for non-group chats.
    pub other: Option<PeerSummary>,
    /// Tag of the connected external app the chat belongs to. `None` for native chats.
    pub origin: Option<String>,
    pub last_message: String,
    pub last_at_unix_ms: Option<i64>,
    pub unread: u32,
    pub is_synthetic: bool,
}

impl ChatSummary {
    /// Creates a native, non-group chat with no activity.
    pub fn new(id: impl Into<ChatId>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            is_group: false,
            is_self_chat: false,
            is_archived: false,
            is_announcement_group: false,
            is_pinned: false,
            pinned_by: BTreeSet::new(),
            other: None,
            origin: None,
            last_message: String::new(),
            last_at_unix_ms: None,
            unread: 0,
            is_synthetic: false,
        }
    }

    /// The placeholder shown until a real self-chat exists server side.
    pub fn synthetic_self_chat() -> Self {
        Self {
            title: SYNTHETIC_SELF_CHAT_TITLE.to_owned(),
            is_self_chat: true,
            last_message: SYNTHETIC_SELF_CHAT_HINT.to_owned(),
            is_synthetic: true,
            ..Self::new(SYNTHETIC_SELF_CHAT_ID)
        }
    }

    pub fn is_pinned_for(&self, user: &UserId) -> bool {
        self.is_pinned || self.pinned_by.contains(user)
    }

    /// Favorites only exist for 1-to-1 chats.
    pub fn is_favorite(&self) -> bool {
        !self.is_group && self.other.as_ref().is_some_and(|peer| peer.is_favorite)
    }

    pub fn is_native(&self) -> bool {
        self.origin.as_deref().is_none_or(str::is_empty)
    }

    pub fn has_origin(&self, origin: &str) -> bool {
        self.origin.as_deref() == Some(origin)
    }
}

/// An external app connected to the account. Its chats carry
/// `chat_origin_id` as their origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedApp {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    pub chat_origin_id: String,
}

/// A message delivered by the realtime bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub sender: UserRef,
    pub body: Option<String>,
    pub attachment_count: usize,
    pub sent_at_unix_ms: i64,
}

impl IncomingMessage {
    pub fn preview(&self) -> String {
        match self.body.as_deref() {
            Some(body) if !body.is_empty() => body.to_owned(),
            _ if self.attachment_count > 0 => ATTACHMENT_PREVIEW.to_owned(),
            _ => String::new(),
        }
    }

    pub fn is_from(&self, user: &UserId) -> bool {
        self.sender.id() == user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: Option<&str>, attachment_count: usize) -> IncomingMessage {
        IncomingMessage {
            chat_id: ChatId::from("c1"),
            sender: UserRef::Reference(UserId::from("u2")),
            body: body.map(str::to_owned),
            attachment_count,
            sent_at_unix_ms: 0,
        }
    }

    #[test]
    fn preview_prefers_body_then_attachment_placeholder() {
        assert_eq!(message(Some("hello"), 1).preview(), "hello");
        assert_eq!(message(Some(""), 2).preview(), "[attachment]");
        assert_eq!(message(None, 1).preview(), "[attachment]");
        assert_eq!(message(None, 0).preview(), "");
    }

    #[test]
    fn user_ref_resolves_id_for_both_shapes() {
        let reference = UserRef::Reference(UserId::from("u1"));
        let populated = UserRef::Populated(UserRecord {
            id: UserId::from("u1"),
            full_name: Some("Ada".to_owned()),
        });

        assert_eq!(reference.id(), populated.id());
    }

    #[test]
    fn pinned_by_local_user_counts_as_pinned() {
        let mut chat = ChatSummary::new("c1");
        chat.pinned_by.insert(UserId::from("me"));

        assert!(chat.is_pinned_for(&UserId::from("me")));
        assert!(!chat.is_pinned_for(&UserId::from("someone-else")));
    }

    #[test]
    fn group_chats_are_never_favorites() {
        let mut chat = ChatSummary::new("g1");
        chat.is_group = true;
        chat.other = Some(PeerSummary {
            is_favorite: true,
            ..PeerSummary::default()
        });

        assert!(!chat.is_favorite());
    }

    #[test]
    fn empty_origin_is_native() {
        let mut chat = ChatSummary::new("c1");
        assert!(chat.is_native());

        chat.origin = Some(String::new());
        assert!(chat.is_native());

        chat.origin = Some("ecommerce".to_owned());
        assert!(!chat.is_native());
        assert!(chat.has_origin("ecommerce"));
    }
}
