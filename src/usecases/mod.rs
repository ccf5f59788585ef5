//! Use case layer: application workflows and orchestration.

pub mod bootstrap;
pub mod connected_apps;
pub mod context;
pub mod contracts;
pub mod live_chat_list;
pub mod load_snapshot;
pub mod open_chat;

/// Returns the usecases module name for smoke checks.
pub fn module_name() -> &'static str {
    "usecases"
}
