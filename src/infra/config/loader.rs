use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::infra::{
    config::{file_config::FileConfig, AppConfig},
    error::AppError,
};

const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const TOKEN_ENV_VAR: &str = "LIVECHAT_TOKEN";

/// Loads defaults, then the TOML file if present, then environment overrides.
pub fn load(path: Option<&Path>) -> Result<AppConfig, AppError> {
    let mut config = load_file(path)?;

    if let Some(token) = env::var(TOKEN_ENV_VAR).ok().filter(|token| !token.is_empty()) {
        config.account.token = Some(token);
    }

    Ok(config)
}

fn load_file(path: Option<&Path>) -> Result<AppConfig, AppError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = AppConfig::default();

    if !config_path.exists() {
        return Ok(config);
    }

    let raw = fs::read_to_string(&config_path).map_err(|source| AppError::ConfigRead {
        path: config_path.clone(),
        source,
    })?;

    let file_config: FileConfig = toml::from_str(&raw).map_err(|source| AppError::ConfigParse {
        path: config_path,
        source,
    })?;

    file_config.merge_into(&mut config);
    Ok(config)
}
