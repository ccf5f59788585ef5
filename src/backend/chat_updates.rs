use std::{sync::mpsc::Sender, time::Duration};

use futures_util::{SinkExt, StreamExt};
use tokio::{runtime::Runtime, sync::watch};
use tokio_tungstenite::tungstenite::Message;

use crate::{
    backend::{
        socket_frames::{self, Frame},
        wire,
    },
    usecases::contracts::StoreCommand,
};

const CHAT_UPDATES_MONITOR_STARTED: &str = "BACKEND_CHAT_UPDATES_MONITOR_STARTED";
const CHAT_UPDATES_MONITOR_STOPPED: &str = "BACKEND_CHAT_UPDATES_MONITOR_STOPPED";
const CHAT_UPDATES_MONITOR_STOP_SIGNALED: &str = "BACKEND_CHAT_UPDATES_MONITOR_STOP_SIGNALED";
const CHAT_UPDATES_CONNECT_FAILED: &str = "BACKEND_CHAT_UPDATES_CONNECT_FAILED";
const CHAT_UPDATES_CONNECTION_LOST: &str = "BACKEND_CHAT_UPDATES_CONNECTION_LOST";
const CHAT_UPDATES_FRAME_REJECTED: &str = "BACKEND_CHAT_UPDATES_FRAME_REJECTED";
const CHAT_UPDATES_EVENT_REJECTED: &str = "BACKEND_CHAT_UPDATES_EVENT_REJECTED";

const INITIAL_BACKOFF: Duration = Duration::from_secs(2);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Streams realtime chat events into the chat list command channel until dropped.
#[derive(Debug)]
pub struct ChatUpdatesMonitor {
    stop_tx: Option<watch::Sender<bool>>,
}

impl ChatUpdatesMonitor {
    pub fn start(
        runtime: &Runtime,
        events_url: String,
        token: String,
        command_tx: Sender<StoreCommand>,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        runtime.spawn(run_monitor(events_url, token, command_tx, stop_rx));

        tracing::info!(
            code = CHAT_UPDATES_MONITOR_STARTED,
            "chat updates monitor started"
        );

        Self {
            stop_tx: Some(stop_tx),
        }
    }
}

impl Drop for ChatUpdatesMonitor {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
            tracing::info!(
                code = CHAT_UPDATES_MONITOR_STOP_SIGNALED,
                "chat updates monitor shutdown signal sent"
            );
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Stopped,
    Lost,
}

async fn run_monitor(
    events_url: String,
    token: String,
    command_tx: Sender<StoreCommand>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        let end = tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    SessionEnd::Stopped
                } else {
                    continue;
                }
            }
            connected = tokio_tungstenite::connect_async(events_url.as_str()) => match connected {
                Ok((stream, _response)) => {
                    backoff = INITIAL_BACKOFF;
                    tracing::info!("chat updates connection established");
                    run_session(stream, &token, &command_tx, &mut stop_rx).await
                }
                Err(error) => {
                    tracing::warn!(
                        code = CHAT_UPDATES_CONNECT_FAILED,
                        error = %error,
                        retry_in_secs = backoff.as_secs(),
                        "chat updates connection failed"
                    );
                    SessionEnd::Lost
                }
            }
        };

        if end == SessionEnd::Stopped {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            _ = stop_rx.changed() => {
                if *stop_rx.borrow() {
                    break;
                }
            }
        }
        backoff = next_backoff(backoff);
    }

    tracing::info!(
        code = CHAT_UPDATES_MONITOR_STOPPED,
        "chat updates monitor stopped"
    );
}

async fn run_session<S>(
    stream: S,
    token: &str,
    command_tx: &Sender<StoreCommand>,
    stop_rx: &mut watch::Receiver<bool>,
) -> SessionEnd
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut write, mut read) = stream.split();

    loop {
        let message = tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    let _ = write.close().await;
                    return SessionEnd::Stopped;
                }
                continue;
            }
            message = read.next() => message,
        };

        let message = match message {
            Some(Ok(message)) => message,
            Some(Err(error)) => {
                tracing::warn!(
                    code = CHAT_UPDATES_CONNECTION_LOST,
                    error = %error,
                    "chat updates connection lost"
                );
                return SessionEnd::Lost;
            }
            None => return SessionEnd::Lost,
        };
        if message.is_close() {
            return SessionEnd::Lost;
        }
        let Message::Text(text) = message else {
            continue;
        };

        let reply = match socket_frames::parse_frame(text.as_str()) {
            Ok(frame) => match handle_frame(frame, token, command_tx) {
                FrameAction::Reply(reply) => Some(reply),
                FrameAction::Continue => None,
                FrameAction::End(end) => return end,
            },
            Err(error) => {
                tracing::debug!(
                    code = CHAT_UPDATES_FRAME_REJECTED,
                    error = %error,
                    "chat updates frame skipped"
                );
                None
            }
        };

        if let Some(reply) = reply {
            if let Err(error) = write.send(Message::Text(reply.into())).await {
                tracing::warn!(
                    code = CHAT_UPDATES_CONNECTION_LOST,
                    error = %error,
                    "chat updates write failed"
                );
                return SessionEnd::Lost;
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum FrameAction {
    Reply(String),
    Continue,
    End(SessionEnd),
}

fn handle_frame(frame: Frame, token: &str, command_tx: &Sender<StoreCommand>) -> FrameAction {
    match frame {
        Frame::Open => FrameAction::Reply(socket_frames::connect_frame(token)),
        Frame::Ping => FrameAction::Reply(socket_frames::PONG_FRAME.to_owned()),
        Frame::Connected => {
            tracing::debug!("chat updates namespace connected");
            // Events may have been missed while disconnected.
            forward(command_tx, StoreCommand::RefreshRequested)
        }
        Frame::Event { name, payload } => match wire::decode_event(&name, payload) {
            Ok(Some(event)) => forward(command_tx, StoreCommand::Event(event)),
            Ok(None) => {
                tracing::trace!(event = %name, "chat updates event ignored");
                FrameAction::Continue
            }
            Err(error) => {
                tracing::warn!(
                    code = CHAT_UPDATES_EVENT_REJECTED,
                    event = %name,
                    error = %error,
                    "chat updates event rejected"
                );
                FrameAction::Continue
            }
        },
        Frame::ConnectError(reason) => {
            tracing::warn!(
                code = CHAT_UPDATES_CONNECTION_LOST,
                reason = %reason,
                "chat updates namespace connect rejected"
            );
            FrameAction::End(SessionEnd::Lost)
        }
        Frame::Close | Frame::Disconnected => FrameAction::End(SessionEnd::Lost),
        Frame::Ignored => FrameAction::Continue,
    }
}

fn forward(command_tx: &Sender<StoreCommand>, command: StoreCommand) -> FrameAction {
    if command_tx.send(command).is_err() {
        // The chat list is gone; nothing left to feed.
        return FrameAction::End(SessionEnd::Stopped);
    }
    FrameAction::Continue
}

fn next_backoff(current: Duration) -> Duration {
    std::cmp::min(current.saturating_mul(2), MAX_BACKOFF)
}
