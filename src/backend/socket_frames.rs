//! Socket.IO v4 text framing over an Engine.IO websocket transport.
//!
//! Only the subset the chat bus uses is understood: handshake, heartbeat,
//! namespace connect/disconnect and event packets. Binary attachments and
//! acknowledgements are not part of the chat stream.

use serde_json::{json, Value};

pub const PONG_FRAME: &str = "3";

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Engine.IO handshake; the client must connect the namespace next.
    Open,
    Close,
    Ping,
    Connected,
    ConnectError(String),
    Disconnected,
    Event { name: String, payload: Value },
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,
    #[error("unknown engine packet type '{0}'")]
    UnknownPacket(char),
    #[error("event packet is not a JSON array with a name")]
    MalformedEvent,
}

/// Namespace connect packet carrying the bearer token as auth payload.
pub fn connect_frame(token: &str) -> String {
    format!("40{}", json!({ "token": token }))
}

pub fn parse_frame(text: &str) -> Result<Frame, FrameError> {
    let mut chars = text.chars();
    let engine_type = chars.next().ok_or(FrameError::Empty)?;
    let rest = chars.as_str();

    match engine_type {
        '0' => Ok(Frame::Open),
        '1' => Ok(Frame::Close),
        '2' => Ok(Frame::Ping),
        '3' | '5' | '6' => Ok(Frame::Ignored),
        '4' => parse_socket_packet(rest),
        other => Err(FrameError::UnknownPacket(other)),
    }
}

fn parse_socket_packet(packet: &str) -> Result<Frame, FrameError> {
    let mut chars = packet.chars();
    let Some(socket_type) = chars.next() else {
        return Ok(Frame::Ignored);
    };
    let body = skip_namespace(chars.as_str());

    match socket_type {
        '0' => Ok(Frame::Connected),
        '1' => Ok(Frame::Disconnected),
        '2' => parse_event(body),
        '4' => Ok(Frame::ConnectError(connect_error_message(body))),
        _ => Ok(Frame::Ignored),
    }
}

// "/chat,12[...]" -> "12[...]"; the default namespace has no prefix.
fn skip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        body.split_once(',').map_or("", |(_, rest)| rest)
    } else {
        body
    }
}

fn parse_event(body: &str) -> Result<Frame, FrameError> {
    let json_start = body.trim_start_matches(|ch: char| ch.is_ascii_digit());
    let value: Value = serde_json::from_str(json_start).map_err(|_| FrameError::MalformedEvent)?;

    let Value::Array(mut items) = value else {
        return Err(FrameError::MalformedEvent);
    };
    if items.is_empty() {
        return Err(FrameError::MalformedEvent);
    }
    let Value::String(name) = items.remove(0) else {
        return Err(FrameError::MalformedEvent);
    };
    let payload = if items.is_empty() {
        Value::Null
    } else {
        items.remove(0)
    };

    Ok(Frame::Event { name, payload })
}

fn connect_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| body.to_owned())
}
