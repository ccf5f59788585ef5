use std::sync::{Mutex, MutexGuard};

use crate::domain::chat::ChatSummary;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serializes tests that read or write process environment variables.
pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().expect("env lock should not be poisoned")
}

/// A native 1-to-1 chat whose last activity happened at `last_at` (unix ms).
pub fn dated_chat(id: &str, last_at: i64) -> ChatSummary {
    ChatSummary {
        last_at_unix_ms: Some(last_at),
        ..ChatSummary::new(id)
    }
}
