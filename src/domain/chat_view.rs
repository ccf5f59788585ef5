//! Partitioning and ordering of the chat collection into UI views.

use std::{cmp::Ordering, fmt, str::FromStr};

use super::chat::{ChatSummary, PeerSummary, UserId};

const SOCIAL_VIEW_PREFIX: &str = "social:";

/// One tab of the chat list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChatView {
    /// Native 1-to-1 chats, including the self-chat.
    Primary,
    Groups,
    Favorites,
    Archived,
    /// Chats owned by one connected external app.
    Social(String),
}

impl ChatView {
    pub fn includes(&self, chat: &ChatSummary) -> bool {
        match self {
            Self::Archived => chat.is_archived,
            _ if chat.is_archived => false,
            Self::Primary => !chat.is_group && chat.is_native(),
            Self::Groups => chat.is_group && !chat.is_announcement_group,
            Self::Favorites => chat.is_favorite(),
            Self::Social(origin) => chat.has_origin(origin),
        }
    }
}

impl fmt::Display for ChatView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Groups => f.write_str("groups"),
            Self::Favorites => f.write_str("favorites"),
            Self::Archived => f.write_str("archived"),
            Self::Social(origin) => write!(f, "{SOCIAL_VIEW_PREFIX}{origin}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatViewParseError {
    #[error("unknown chat view '{0}'")]
    Unknown(String),
    #[error("social view requires an app origin, e.g. 'social:ecommerce'")]
    MissingOrigin,
}

impl FromStr for ChatView {
    type Err = ChatViewParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Some(origin) = value.strip_prefix(SOCIAL_VIEW_PREFIX) {
            if origin.is_empty() {
                return Err(ChatViewParseError::MissingOrigin);
            }
            return Ok(Self::Social(origin.to_owned()));
        }

        match value {
            "primary" | "chats" => Ok(Self::Primary),
            "groups" => Ok(Self::Groups),
            "favorites" => Ok(Self::Favorites),
            "archived" => Ok(Self::Archived),
            "social" => Err(ChatViewParseError::MissingOrigin),
            other => Err(ChatViewParseError::Unknown(other.to_owned())),
        }
    }
}

/// Total order used by every view: self-chat, pinned, favorite, then most recent first.
pub fn compare_chats(a: &ChatSummary, b: &ChatSummary, local_user: &UserId) -> Ordering {
    b.is_self_chat
        .cmp(&a.is_self_chat)
        .then_with(|| b.is_pinned_for(local_user).cmp(&a.is_pinned_for(local_user)))
        .then_with(|| b.is_favorite().cmp(&a.is_favorite()))
        .then_with(|| compare_recency(a.last_at_unix_ms, b.last_at_unix_ms))
        .then_with(|| a.id.cmp(&b.id))
}

// Undated chats go after dated ones.
fn compare_recency(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn sort_chats(chats: &mut [ChatSummary], local_user: &UserId) {
    chats.sort_by(|a, b| compare_chats(a, b, local_user));
}

/// Builds the ordered list for `view`.
///
/// The primary view gets the synthetic self-chat at the top whenever the
/// collection holds no real self-chat, archived or not.
pub fn build_view(chats: &[ChatSummary], view: &ChatView, local_user: &UserId) -> Vec<ChatSummary> {
    let mut items: Vec<ChatSummary> = chats
        .iter()
        .filter(|chat| view.includes(chat))
        .cloned()
        .collect();
    sort_chats(&mut items, local_user);

    if *view == ChatView::Primary && !chats.iter().any(|chat| chat.is_self_chat) {
        items.insert(0, ChatSummary::synthetic_self_chat());
    }

    items
}

/// Peers currently online, for the presence strip above the primary view.
pub fn online_peers(chats: &[ChatSummary], local_user: &UserId) -> Vec<PeerSummary> {
    let mut online: Vec<&ChatSummary> = chats
        .iter()
        .filter(|chat| !chat.is_group && !chat.is_archived)
        .filter(|chat| chat.other.as_ref().is_some_and(|peer| peer.is_online))
        .collect();
    online.sort_by(|a, b| compare_chats(a, b, local_user));

    online
        .into_iter()
        .filter_map(|chat| chat.other.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::chat::SYNTHETIC_SELF_CHAT_ID, test_support::dated_chat as chat};

    fn me() -> UserId {
        UserId::from("me")
    }

    fn ids(chats: &[ChatSummary]) -> Vec<&str> {
        chats.iter().map(|chat| chat.id.as_str()).collect()
    }

    fn favorite(mut chat: ChatSummary) -> ChatSummary {
        chat.other = Some(PeerSummary {
            id: UserId::from("peer"),
            is_favorite: true,
            ..PeerSummary::default()
        });
        chat
    }

    #[test]
    fn empty_primary_view_contains_only_the_synthetic_self_chat() {
        let view = build_view(&[], &ChatView::Primary, &me());

        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id.as_str(), SYNTHETIC_SELF_CHAT_ID);
        assert!(view[0].is_synthetic);
        assert_eq!(view[0].unread, 0);
    }

    #[test]
    fn most_recent_chat_comes_first() {
        let mut self_chat = chat("self", 0);
        self_chat.is_self_chat = true;
        let chats = vec![chat("a", 36_000_000), chat("b", 36_300_000), self_chat];

        let view = build_view(&chats, &ChatView::Primary, &me());

        assert_eq!(ids(&view), vec!["self", "b", "a"]);
    }

    #[test]
    fn tiers_rank_self_then_pinned_then_favorite_then_recency() {
        let mut self_chat = chat("self", 1);
        self_chat.is_self_chat = true;
        let mut pinned = chat("pinned", 2);
        pinned.is_pinned = true;
        let mut pinned_by_me = chat("pinned-by-me", 3);
        pinned_by_me.pinned_by.insert(me());
        let fav = favorite(chat("fav", 4));
        let recent = chat("recent", 100);

        let mut chats = vec![recent, fav, pinned, self_chat, pinned_by_me];
        sort_chats(&mut chats, &me());

        assert_eq!(
            ids(&chats),
            vec!["self", "pinned-by-me", "pinned", "fav", "recent"]
        );
    }

    #[test]
    fn pinned_by_other_user_does_not_promote_chat() {
        let mut pinned_by_other = chat("other-pin", 1);
        pinned_by_other.pinned_by.insert(UserId::from("someone"));
        let mut chats = vec![pinned_by_other, chat("recent", 5)];

        sort_chats(&mut chats, &me());

        assert_eq!(ids(&chats), vec!["recent", "other-pin"]);
    }

    #[test]
    fn ties_and_missing_timestamps_resolve_deterministically() {
        let chats = vec![
            ChatSummary::new("undated"),
            chat("b", 10),
            chat("a", 10),
            chat("c", 20),
        ];

        let mut forward = chats.clone();
        sort_chats(&mut forward, &me());
        let mut reversed: Vec<ChatSummary> = chats.into_iter().rev().collect();
        sort_chats(&mut reversed, &me());

        assert_eq!(ids(&forward), vec!["c", "a", "b", "undated"]);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn partitions_filter_by_kind_origin_and_archive_flag() {
        let mut group = chat("group", 1);
        group.is_group = true;
        let mut announcement = chat("announce", 2);
        announcement.is_group = true;
        announcement.is_announcement_group = true;
        let mut archived = chat("archived", 3);
        archived.is_archived = true;
        archived.is_group = true;
        let mut shop = chat("shop", 4);
        shop.origin = Some("ecommerce".to_owned());
        let mut archived_shop = chat("archived-shop", 5);
        archived_shop.origin = Some("ecommerce".to_owned());
        archived_shop.is_archived = true;
        let fav = favorite(chat("fav", 6));
        let direct = chat("direct", 7);

        let chats = vec![group, announcement, archived, shop, archived_shop, fav, direct];

        let primary = build_view(&chats, &ChatView::Primary, &me());
        assert_eq!(ids(&primary), vec![SYNTHETIC_SELF_CHAT_ID, "fav", "direct"]);

        let groups = build_view(&chats, &ChatView::Groups, &me());
        assert_eq!(ids(&groups), vec!["group"]);

        let favorites = build_view(&chats, &ChatView::Favorites, &me());
        assert_eq!(ids(&favorites), vec!["fav"]);

        let archived = build_view(&chats, &ChatView::Archived, &me());
        assert_eq!(ids(&archived), vec!["archived-shop", "archived"]);

        let social = build_view(&chats, &ChatView::Social("ecommerce".to_owned()), &me());
        assert_eq!(ids(&social), vec!["shop"]);
    }

    #[test]
    fn archived_self_chat_still_suppresses_synthetic_entry() {
        let mut self_chat = chat("self", 1);
        self_chat.is_self_chat = true;
        self_chat.is_archived = true;

        let view = build_view(&[self_chat], &ChatView::Primary, &me());

        assert!(view.is_empty());
    }

    #[test]
    fn online_peers_skip_groups_and_archived_chats() {
        let mut online = chat("online", 2);
        online.other = Some(PeerSummary {
            id: UserId::from("ada"),
            is_online: true,
            ..PeerSummary::default()
        });
        let mut archived = online.clone();
        archived.id = "archived".into();
        archived.is_archived = true;
        let mut offline = chat("offline", 3);
        offline.other = Some(PeerSummary::default());

        let peers = online_peers(&[online, archived, offline], &me());

        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].id.as_str(), "ada");
    }

    #[test]
    fn parses_view_ids() {
        assert_eq!("primary".parse::<ChatView>(), Ok(ChatView::Primary));
        assert_eq!("groups".parse::<ChatView>(), Ok(ChatView::Groups));
        assert_eq!(
            "social:ecommerce".parse::<ChatView>(),
            Ok(ChatView::Social("ecommerce".to_owned()))
        );
        assert_eq!(
            "social:".parse::<ChatView>(),
            Err(ChatViewParseError::MissingOrigin)
        );
        assert!(matches!(
            "calls".parse::<ChatView>(),
            Err(ChatViewParseError::Unknown(_))
        ));
        assert_eq!(
            ChatView::Social("shop".to_owned()).to_string(),
            "social:shop"
        );
    }
}
