//! JSON records exchanged with the chat backend and their domain mapping.

use std::collections::BTreeSet;

use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{
    chat::{
        ChatId, ChatSummary, ConnectedApp, IncomingMessage, PeerSummary, UserId, UserRecord,
        UserRef,
    },
    events::ChatEvent,
};

pub const EVENT_MESSAGE_NEW: &str = "message:new";
pub const EVENT_CHAT_PINNED: &str = "chat:pinned";
pub const EVENT_CHAT_UNPINNED: &str = "chat:unpinned";
pub const EVENT_CHATS_UPDATE: &str = "chats:update";

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed {kind} payload: {source}")]
    Malformed {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
}

/// Ids arrive as strings (document ids) or numbers.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum WireId {
    Text(String),
    Number(i64),
}

impl WireId {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

impl From<WireId> for ChatId {
    fn from(id: WireId) -> Self {
        ChatId::new(id.into_text())
    }
}

impl From<WireId> for UserId {
    fn from(id: WireId) -> Self {
        UserId::new(id.into_text())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    UnixMillis(i64),
    Rfc3339(String),
}

impl WireTimestamp {
    fn to_unix_ms(&self) -> Result<i64, WireError> {
        match self {
            Self::UnixMillis(ms) => Ok(*ms),
            Self::Rfc3339(text) => DateTime::parse_from_rfc3339(text)
                .map(|at| at.timestamp_millis())
                .map_err(|_| WireError::InvalidTimestamp(text.clone())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserDto {
    #[serde(alias = "_id")]
    pub id: WireId,
    #[serde(default, alias = "fullName")]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireUserRef {
    Id(WireId),
    Populated(UserDto),
}

impl From<WireUserRef> for UserRef {
    fn from(value: WireUserRef) -> Self {
        match value {
            WireUserRef::Id(id) => UserRef::Reference(id.into()),
            WireUserRef::Populated(user) => UserRef::Populated(UserRecord {
                id: user.id.into(),
                full_name: user.full_name,
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerDto {
    #[serde(alias = "_id")]
    pub id: WireId,
    #[serde(default)]
    pub is_favorite: Option<bool>,
    #[serde(default)]
    pub is_online: Option<bool>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default, rename = "full_name", alias = "fullName")]
    pub full_name: Option<String>,
}

impl From<PeerDto> for PeerSummary {
    fn from(peer: PeerDto) -> Self {
        Self {
            id: peer.id.into(),
            is_favorite: peer.is_favorite.unwrap_or(false),
            is_online: peer.is_online.unwrap_or(false),
            avatar: peer.avatar,
            full_name: peer.full_name,
        }
    }
}

/// Backend chat record. Flags are nullable on the wire and default to false.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDto {
    #[serde(alias = "_id")]
    pub id: WireId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub is_group: Option<bool>,
    #[serde(default)]
    pub is_self_chat: Option<bool>,
    #[serde(default)]
    pub is_archived: Option<bool>,
    #[serde(default)]
    pub is_announcement_group: Option<bool>,
    #[serde(default)]
    pub is_pinned: Option<bool>,
    #[serde(default)]
    pub pinned_by: Option<Vec<WireUserRef>>,
    #[serde(default)]
    pub other: Option<PeerDto>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_at: Option<WireTimestamp>,
    #[serde(default)]
    pub unread: Option<i64>,
}

impl TryFrom<ChatDto> for ChatSummary {
    type Error = WireError;

    fn try_from(dto: ChatDto) -> Result<Self, Self::Error> {
        let last_at_unix_ms = dto
            .last_at
            .as_ref()
            .map(WireTimestamp::to_unix_ms)
            .transpose()?;
        let is_group = dto.is_group.unwrap_or(false);
        let pinned_by: BTreeSet<UserId> = dto
            .pinned_by
            .unwrap_or_default()
            .into_iter()
            .map(|user| UserRef::from(user).id().clone())
            .collect();

        Ok(Self {
            id: dto.id.into(),
            title: dto.title.unwrap_or_default(),
            is_group,
            is_self_chat: dto.is_self_chat.unwrap_or(false),
            is_archived: dto.is_archived.unwrap_or(false),
            is_announcement_group: dto.is_announcement_group.unwrap_or(false),
            is_pinned: dto.is_pinned.unwrap_or(false),
            pinned_by,
            other: dto.other.filter(|_| !is_group).map(PeerSummary::from),
            origin: dto.origin.filter(|origin| !origin.is_empty()),
            last_message: dto.last_message.unwrap_or_default(),
            last_at_unix_ms,
            unread: u32::try_from(dto.unread.unwrap_or(0).max(0)).unwrap_or(u32::MAX),
            is_synthetic: false,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub chat: WireId,
    pub sender: WireUserRef,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub attachments: Option<Vec<Value>>,
    pub created_at: WireTimestamp,
}

impl TryFrom<MessageDto> for IncomingMessage {
    type Error = WireError;

    fn try_from(dto: MessageDto) -> Result<Self, Self::Error> {
        Ok(Self {
            chat_id: dto.chat.into(),
            sender: dto.sender.into(),
            body: dto.body,
            attachment_count: dto.attachments.map_or(0, |items| items.len()),
            sent_at_unix_ms: dto.created_at.to_unix_ms()?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRefDto {
    chat_id: WireId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatsUpdateDto {
    chat_id: WireId,
    #[serde(default)]
    unread_reset_for: Option<WireId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectedAppDto {
    #[serde(alias = "_id")]
    id: WireId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    chat_origin_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ConnectedAppsResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    apps: Vec<ConnectedAppDto>,
}

pub fn decode_chat(value: Value) -> Result<ChatSummary, WireError> {
    let dto: ChatDto = parse("chat", value)?;
    ChatSummary::try_from(dto)
}

pub fn decode_chats(value: Value) -> Result<Vec<ChatSummary>, WireError> {
    let dtos: Vec<ChatDto> = parse("chat list", value)?;
    dtos.into_iter().map(ChatSummary::try_from).collect()
}

/// An unsuccessful response means no apps. Apps without a chat origin own no
/// chats and are skipped.
pub fn decode_connected_apps(value: Value) -> Result<Vec<ConnectedApp>, WireError> {
    let response: ConnectedAppsResponse = parse("connected apps", value)?;
    if !response.success {
        return Ok(Vec::new());
    }

    Ok(response
        .apps
        .into_iter()
        .filter_map(|app| {
            let chat_origin_id = app.chat_origin_id.filter(|origin| !origin.is_empty())?;
            Some(ConnectedApp {
                id: app.id.into_text(),
                name: app.name.unwrap_or_else(|| chat_origin_id.clone()),
                icon: app.icon,
                chat_origin_id,
            })
        })
        .collect())
}

/// Maps one bus event to a domain event. Unknown event names yield `Ok(None)`.
pub fn decode_event(name: &str, payload: Value) -> Result<Option<ChatEvent>, WireError> {
    let event = match name {
        EVENT_MESSAGE_NEW => {
            let dto: MessageDto = parse(EVENT_MESSAGE_NEW, payload)?;
            ChatEvent::NewMessage(IncomingMessage::try_from(dto)?)
        }
        EVENT_CHAT_PINNED => {
            let dto: ChatRefDto = parse(EVENT_CHAT_PINNED, payload)?;
            ChatEvent::Pinned(dto.chat_id.into())
        }
        EVENT_CHAT_UNPINNED => {
            let dto: ChatRefDto = parse(EVENT_CHAT_UNPINNED, payload)?;
            ChatEvent::Unpinned(dto.chat_id.into())
        }
        EVENT_CHATS_UPDATE => {
            let dto: ChatsUpdateDto = parse(EVENT_CHATS_UPDATE, payload)?;
            let Some(for_user) = dto.unread_reset_for else {
                return Ok(None);
            };
            ChatEvent::UnreadReset {
                chat_id: dto.chat_id.into(),
                for_user: for_user.into(),
            }
        }
        _ => return Ok(None),
    };

    Ok(Some(event))
}

fn parse<T: serde::de::DeserializeOwned>(kind: &'static str, value: Value) -> Result<T, WireError> {
    serde_json::from_value(value).map_err(|source| WireError::Malformed { kind, source })
}
