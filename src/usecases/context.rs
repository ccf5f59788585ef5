use tracing_appender::non_blocking::WorkerGuard;

use crate::{domain::chat::UserId, infra::config::AppConfig};

#[derive(Debug)]
pub struct AppContext {
    pub config: AppConfig,
    pub local_user: UserId,
    _log_guard: Option<WorkerGuard>,
}

impl AppContext {
    pub fn new(config: AppConfig, log_guard: Option<WorkerGuard>) -> Self {
        let local_user = UserId::new(config.account.user_id.clone());
        Self {
            config,
            local_user,
            _log_guard: log_guard,
        }
    }
}
