use std::path::Path;

use crate::{
    infra::{self, config::AppConfig, error::AppError},
    usecases::context::AppContext,
};

pub fn bootstrap(config_path: Option<&Path>) -> Result<AppContext, AppError> {
    let config = build_config(config_path)?;
    let log_guard = infra::logging::init(&config.logging)?;

    Ok(AppContext::new(config, log_guard))
}

fn build_config(config_path: Option<&Path>) -> Result<AppConfig, AppError> {
    let config = infra::config::load(config_path)?;

    if config.account.user_id.trim().is_empty() {
        return Err(AppError::MissingUserId);
    }

    Ok(config)
}
