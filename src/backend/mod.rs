//! Chat backend integration: REST snapshot client and realtime event stream.

pub mod chat_updates;
pub mod dispatcher;
pub mod http;
pub mod socket_frames;
pub mod wire;

/// Returns the backend module name for smoke checks.
pub fn module_name() -> &'static str {
    "backend"
}
