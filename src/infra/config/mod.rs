mod app_config;
mod file_config;
mod loader;

pub use app_config::{AccountConfig, AppConfig, BackendConfig, LogConfig};
pub use loader::load;
