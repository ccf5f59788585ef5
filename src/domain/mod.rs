//! Domain layer: chat entities, the live collection and its views.

pub mod chat;
pub mod chat_list_state;
pub mod chat_view;
pub mod events;

/// Returns the domain module name for smoke checks.
pub fn module_name() -> &'static str {
    "domain"
}
