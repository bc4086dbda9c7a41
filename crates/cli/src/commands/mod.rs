pub mod chat;
pub mod config_cmd;
pub mod render;
pub mod status;

use scenewright_config::{AppConfig, Profile};

/// Load the configuration and resolve the requested profile.
pub(crate) fn load_profile(
    name: Option<&str>,
) -> Result<(AppConfig, Profile), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let profile = match name {
        Some(name) => config.profile(name)?,
        None => config.active_profile()?,
    }
    .clone();
    Ok((config, profile))
}
