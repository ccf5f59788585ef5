use serde_json::{json, Value};

use crate::{
    backend::wire,
    domain::chat::{ChatId, ChatSummary, ConnectedApp},
    infra::config::{AccountConfig, BackendConfig},
    usecases::contracts::{ChatSource, ChatSourceError},
};

const HTTP_REQUEST_FAILED: &str = "BACKEND_HTTP_REQUEST_FAILED";
const HTTP_STATUS_REJECTED: &str = "BACKEND_HTTP_STATUS_REJECTED";
const HTTP_PAYLOAD_INVALID: &str = "BACKEND_HTTP_PAYLOAD_INVALID";

/// Blocking REST client for the chat endpoints.
#[derive(Clone)]
pub struct HttpChatSource {
    agent: ureq::Agent,
    api_base_url: String,
    token: Option<String>,
    phone: Option<String>,
}

impl HttpChatSource {
    pub fn new(backend: &BackendConfig, account: &AccountConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            api_base_url: backend.api_base_url.trim_end_matches('/').to_owned(),
            token: account.token.clone().filter(|token| !token.is_empty()),
            phone: account.phone.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }

    fn bearer(&self) -> Result<String, ChatSourceError> {
        self.token
            .as_deref()
            .map(|token| format!("Bearer {token}"))
            .ok_or(ChatSourceError::Unauthorized)
    }

    fn get_json(&self, path: &str) -> Result<Value, ChatSourceError> {
        let url = self.url(path);
        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.bearer()?)
            .call();

        read_json(&url, response)
    }

    fn post_json(&self, path: &str, payload: Value) -> Result<Value, ChatSourceError> {
        let url = self.url(path);
        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.bearer()?)
            .send_json(payload);

        read_json(&url, response)
    }
}

impl ChatSource for HttpChatSource {
    fn list_chats(&self) -> Result<Vec<ChatSummary>, ChatSourceError> {
        let value = self.get_json("chats")?;
        wire::decode_chats(value).map_err(|error| invalid_payload("chats", &error))
    }

    fn fetch_chat(&self, chat_id: &ChatId) -> Result<ChatSummary, ChatSourceError> {
        let value = self.get_json(&format!("chats/{chat_id}"))?;
        if value.is_null() {
            return Err(ChatSourceError::NotFound);
        }
        wire::decode_chat(value).map_err(|error| invalid_payload("chat", &error))
    }

    fn open_self_chat(&self) -> Result<ChatSummary, ChatSourceError> {
        let Some(phone) = self.phone.as_deref() else {
            tracing::warn!("account.phone is not configured; cannot open the self-chat");
            return Err(ChatSourceError::InvalidData);
        };

        let value = self.post_json("chats/open", json!({ "targetPhone": phone }))?;
        wire::decode_chat(value).map_err(|error| invalid_payload("self-chat", &error))
    }

    fn list_connected_apps(&self) -> Result<Vec<ConnectedApp>, ChatSourceError> {
        let value = self.get_json("integration/apps")?;
        wire::decode_connected_apps(value)
            .map_err(|error| invalid_payload("connected apps", &error))
    }
}

fn read_json(
    url: &str,
    response: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
) -> Result<Value, ChatSourceError> {
    let mut response = response.map_err(|error| {
        tracing::warn!(code = HTTP_REQUEST_FAILED, url, error = %error, "backend request failed");
        ChatSourceError::Unavailable
    })?;

    let status = response.status().as_u16();
    if let Err(error) = map_status(status) {
        tracing::warn!(code = HTTP_STATUS_REJECTED, url, status, "backend rejected request");
        return Err(error);
    }

    let raw = response.body_mut().read_to_string().map_err(|error| {
        tracing::warn!(code = HTTP_REQUEST_FAILED, url, error = %error, "backend body read failed");
        ChatSourceError::Unavailable
    })?;
    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&raw).map_err(|error| invalid_payload(url, &error))
}

fn map_status(status: u16) -> Result<(), ChatSourceError> {
    match status {
        200..=299 => Ok(()),
        401 | 403 => Err(ChatSourceError::Unauthorized),
        404 => Err(ChatSourceError::NotFound),
        _ => Err(ChatSourceError::Unavailable),
    }
}

fn invalid_payload(what: &str, error: &dyn std::error::Error) -> ChatSourceError {
    tracing::warn!(code = HTTP_PAYLOAD_INVALID, what, error = %error, "backend payload rejected");
    ChatSourceError::InvalidData
}
