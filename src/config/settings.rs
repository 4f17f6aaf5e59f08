use anyhow::Result;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

use super::EngineConfig;

const APP_NAME: &str = "Tearoff";
const CONFIG_FILE: &str = "config.json";

/// Returns the platform-specific configuration directory for the engine.
pub fn get_config_directory() -> Option<PathBuf> {
    ProjectDirs::from("org", "tearoff", APP_NAME)
        .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
}

/// Returns the full path to the configuration file, honouring an override.
pub fn get_config_file_path(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => Some(path.to_path_buf()),
        None => get_config_directory().map(|dir| dir.join(CONFIG_FILE)),
    }
}

/// Loads the engine configuration.
/// If the file doesn't exist, a default one is written.
/// If the file cannot be parsed, a warning is logged and the defaults are used.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config_path = get_config_file_path(path)
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    if !config_path.exists() {
        tracing::info!(
            "Config file not found, creating default config at {:?}",
            config_path
        );
        let default_config = EngineConfig::default();
        save_config(&default_config, Some(&config_path))?;
        return Ok(default_config);
    }

    let config_content = fs::read_to_string(&config_path)?;
    match serde_json::from_str::<EngineConfig>(&config_content) {
        Ok(config) => {
            tracing::info!("Loaded config from {:?}", config_path);
            Ok(config)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse config file at {:?}: {}. Falling back to default config.",
                config_path,
                e
            );
            Ok(EngineConfig::default())
        }
    }
}

/// Saves the configuration, creating its directory if needed.
pub fn save_config(config: &EngineConfig, path: Option<&Path>) -> Result<()> {
    let config_path = get_config_file_path(path)
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    if let Some(config_dir) = config_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            tracing::info!("Created config directory: {:?}", config_dir);
        }
    }

    let config_json = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, config_json)?;
    tracing::info!("Saved config to {:?}", config_path);
    Ok(())
}
