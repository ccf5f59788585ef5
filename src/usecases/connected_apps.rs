use crate::{
    domain::{chat::ConnectedApp, chat_list_state::ChatListState, chat_view::ChatView},
    usecases::{
        contracts::ChatSource,
        load_snapshot::{map_source_error, LoadSnapshotError},
    },
};

/// A connected app with the unread total of the chats it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppBadge {
    pub app: ConnectedApp,
    pub unread: u32,
}

impl AppBadge {
    pub fn view(&self) -> ChatView {
        ChatView::Social(self.app.chat_origin_id.clone())
    }
}

/// Lists connected apps in backend order, badged from the current collection.
pub fn connected_app_badges(
    source: &dyn ChatSource,
    state: &ChatListState,
) -> Result<Vec<AppBadge>, LoadSnapshotError> {
    let apps = source.list_connected_apps().map_err(map_source_error)?;

    Ok(apps
        .into_iter()
        .map(|app| {
            let unread = state.total_unread(&ChatView::Social(app.chat_origin_id.clone()));
            AppBadge { app, unread }
        })
        .collect())
}
