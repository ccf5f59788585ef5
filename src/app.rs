use std::{
    io::BufRead,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver},
        Arc,
    },
    thread,
    time::Duration,
};

use anyhow::Result;

use crate::{
    backend::{
        self, chat_updates::ChatUpdatesMonitor, dispatcher::RuntimeDispatcher,
        http::HttpChatSource,
    },
    cli::{Cli, Command, WatchInput},
    domain::{
        self,
        chat::{ChatId, ChatSummary, PeerSummary},
        chat_view::ChatView,
    },
    infra::{self, error::AppError},
    usecases::{
        self, bootstrap,
        connected_apps::AppBadge,
        context::AppContext,
        contracts::{ChatListNotice, StoreCommand},
        live_chat_list::LiveChatList,
        open_chat::OpenChatOutcome,
    },
};

const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(250);
const WATCH_OPEN_CHAT_FAILED: &str = "WATCH_OPEN_CHAT_FAILED";
const WATCH_REALTIME_DISABLED: &str = "WATCH_REALTIME_DISABLED";
const WATCH_INPUT_REJECTED: &str = "WATCH_INPUT_REJECTED";

type HttpChatList = LiveChatList<HttpChatSource, RuntimeDispatcher<HttpChatSource>>;

pub fn run(cli: Cli) -> Result<()> {
    tracing::debug!(
        domain = domain::module_name(),
        backend = backend::module_name(),
        usecases = usecases::module_name(),
        infra = infra::module_name(),
        "module boundaries loaded"
    );

    let context = bootstrap::bootstrap(cli.config.as_deref())?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(AppError::RuntimeStart)?;

    let source = HttpChatSource::new(&context.config.backend, &context.config.account);
    let dispatcher = RuntimeDispatcher::new(runtime.handle().clone(), source.clone());
    let mut chat_list = LiveChatList::new(context.local_user.clone(), source, dispatcher);

    match cli.command_or_default() {
        Command::View { tab } => {
            chat_list.load()?;
            print_lines(&render_view(&chat_list, &tab));
        }
        Command::Apps => {
            chat_list.load()?;
            print_lines(&render_apps(&chat_list.connected_apps()?));
        }
        Command::Watch { tab, focus, open } => {
            watch(&context, &runtime, &mut chat_list, &tab, focus, open)?;
        }
    }

    Ok(())
}

fn watch(
    context: &AppContext,
    runtime: &tokio::runtime::Runtime,
    chat_list: &mut HttpChatList,
    tab: &ChatView,
    focus: Option<ChatId>,
    open: Option<ChatId>,
) -> Result<()> {
    if let Some(chat_id) = open {
        chat_list.set_pending_deep_link(chat_id);
    }
    let notices = chat_list.subscribe();
    chat_list.load()?;

    if let Some(chat_id) = focus {
        chat_list.handle(StoreCommand::FocusChanged(chat_id));
    }

    let _monitor = match context.config.account.token.clone() {
        Some(token) if !token.is_empty() => Some(ChatUpdatesMonitor::start(
            runtime,
            context.config.backend.events_url.clone(),
            token,
            chat_list.command_sender(),
        )),
        _ => {
            tracing::warn!(
                code = WATCH_REALTIME_DISABLED,
                "no account token configured; realtime updates are disabled"
            );
            None
        }
    };

    let stop = Arc::new(AtomicBool::new(false));
    let stop_on_signal = Arc::clone(&stop);
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop_on_signal.store(true, Ordering::SeqCst);
        }
    });

    let inputs = spawn_input_reader();

    let mut dirty = true;
    while !stop.load(Ordering::SeqCst) {
        while let Ok(input) = inputs.try_recv() {
            apply_input(chat_list, input);
        }
        chat_list.wait_and_process(WATCH_POLL_INTERVAL);

        while let Ok(notice) = notices.try_recv() {
            match notice {
                ChatListNotice::Changed => dirty = true,
                ChatListNotice::OpenChatRequested(chat_id) => {
                    open_requested(chat_list, &chat_id);
                    dirty = true;
                }
            }
        }

        if dirty {
            print_lines(&render_view(chat_list, tab));
            dirty = false;
        }
    }

    tracing::info!("watch stopped");
    Ok(())
}

// Reads stdin on its own thread; the channel closes when stdin does.
fn spawn_input_reader() -> Receiver<WatchInput> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<WatchInput>() {
                Ok(input) => {
                    if tx.send(input).is_err() {
                        break;
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        code = WATCH_INPUT_REJECTED,
                        error = %error,
                        "watch input ignored"
                    );
                    eprintln!("{error}");
                }
            }
        }
    });
    rx
}

fn apply_input(chat_list: &mut HttpChatList, input: WatchInput) {
    match input {
        WatchInput::Focus(chat_id) => chat_list.handle(StoreCommand::FocusChanged(chat_id)),
        WatchInput::Unfocus => chat_list.handle(StoreCommand::FocusCleared),
        WatchInput::Refresh => chat_list.handle(StoreCommand::RefreshRequested),
        WatchInput::Open(chat_id) => open_requested(chat_list, &chat_id),
    }
}

fn open_requested(chat_list: &mut HttpChatList, chat_id: &ChatId) {
    match chat_list.open_chat(chat_id) {
        Ok(OpenChatOutcome::Focused(opened) | OpenChatOutcome::Materialized(opened)) => {
            println!("Opened chat {opened}");
        }
        Ok(OpenChatOutcome::NotFound) => {}
        Err(error) => {
            tracing::warn!(
                code = WATCH_OPEN_CHAT_FAILED,
                chat_id = %chat_id,
                error = %error,
                "failed to open chat"
            );
        }
    }
}

fn render_view(chat_list: &HttpChatList, tab: &ChatView) -> Vec<String> {
    let state = chat_list.state();
    let chats = chat_list.view(tab);
    let mut lines = Vec::with_capacity(chats.len() + 1);
    lines.push(format!(
        "== {tab} ({} chats, {} unread) ==",
        chats.len(),
        chat_list.total_unread(tab)
    ));
    if *tab == ChatView::Primary {
        lines.extend(presence_line(&chat_list.online_peers()));
    }
    lines.extend(
        chats
            .iter()
            .map(|chat| {
                chat_line(
                    chat,
                    state.focused() == Some(&chat.id),
                    chat.is_pinned_for(state.local_user()),
                )
            }),
    );
    lines
}

fn presence_line(peers: &[PeerSummary]) -> Option<String> {
    if peers.is_empty() {
        return None;
    }

    let names: Vec<&str> = peers.iter().map(peer_name).collect();
    Some(format!("online: {}", names.join(", ")))
}

fn peer_name(peer: &PeerSummary) -> &str {
    peer.full_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| peer.id.as_str())
}

fn render_apps(badges: &[AppBadge]) -> Vec<String> {
    if badges.is_empty() {
        return vec!["No connected apps.".to_owned()];
    }

    badges
        .iter()
        .map(|badge| {
            let unread = if badge.unread > 0 {
                format!("({})", badge.unread)
            } else {
                String::new()
            };
            format!("{:<24} {:>5}  --tab {}", badge.app.name, unread, badge.view())
        })
        .collect()
}

fn chat_line(chat: &ChatSummary, focused: bool, pinned: bool) -> String {
    let marker = if focused { '>' } else { ' ' };
    let pin = if pinned { '^' } else { ' ' };
    let unread = if chat.unread > 0 {
        format!("({})", chat.unread)
    } else {
        String::new()
    };

    format!(
        "{marker}{pin} {:<24} {:>5}  {}",
        display_title(chat),
        unread,
        chat.last_message
    )
    .trim_end()
    .to_owned()
}

fn display_title(chat: &ChatSummary) -> &str {
    if !chat.title.is_empty() {
        return &chat.title;
    }

    chat.other
        .as_ref()
        .and_then(|peer| peer.full_name.as_deref())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| chat.id.as_str())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
