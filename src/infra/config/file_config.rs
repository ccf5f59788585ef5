use std::path::PathBuf;

use serde::Deserialize;

use crate::infra::config::{AccountConfig, AppConfig, BackendConfig, LogConfig};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub backend: Option<FileBackendConfig>,
    pub account: Option<FileAccountConfig>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(backend) = self.backend {
            backend.merge_into(&mut config.backend);
        }

        if let Some(account) = self.account {
            account.merge_into(&mut config.account);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }

        if let Some(file) = self.file {
            config.file = Some(file);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileBackendConfig {
    pub api_base_url: Option<String>,
    pub events_url: Option<String>,
}

impl FileBackendConfig {
    fn merge_into(self, config: &mut BackendConfig) {
        if let Some(api_base_url) = self.api_base_url {
            config.api_base_url = api_base_url;
        }

        if let Some(events_url) = self.events_url {
            config.events_url = events_url;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileAccountConfig {
    pub user_id: Option<String>,
    pub phone: Option<String>,
    pub token: Option<String>,
}

impl FileAccountConfig {
    fn merge_into(self, config: &mut AccountConfig) {
        if let Some(user_id) = self.user_id {
            config.user_id = user_id;
        }

        if let Some(phone) = self.phone {
            config.phone = Some(phone);
        }

        if let Some(token) = self.token {
            config.token = Some(token);
        }
    }
}
