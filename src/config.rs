pub mod range_types;

use crate::game_logic::errors::{RampartError, RampartResult};
use crate::resources::RampartConfig;
use bevy::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

pub fn get_config_path() -> RampartResult<PathBuf> {
    let mut path = dirs::config_dir().ok_or(RampartError::ConfigDirNotFound)?;
    path.push("rampart");
    fs::create_dir_all(&path)?;
    path.push("config.toml");
    Ok(path)
}

/// User config, or defaults when there is none or it does not parse
pub fn load_config() -> RampartConfig {
    match get_config_path().and_then(|path| load_config_from(&path)) {
        Ok(config) => config,
        Err(RampartError::ConfigFileNotFound { .. }) => RampartConfig::default(),
        Err(err) => {
            warn!("Using default navigation settings: {err}");
            RampartConfig::default()
        }
    }
}

pub fn load_config_from(path: &Path) -> RampartResult<RampartConfig> {
    if !path.exists() {
        return Err(RampartError::ConfigFileNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = fs::read_to_string(path)?;
    let mut config = toml::from_str::<RampartConfig>(&contents)?;
    if config.settings.sanitize() {
        warn!("Out-of-range navigation settings in {} were adjusted", path.display());
    }
    Ok(config)
}

pub fn save_config(config: &RampartConfig) -> RampartResult<()> {
    save_config_to(config, &get_config_path()?)
}

pub fn save_config_to(config: &RampartConfig, path: &Path) -> RampartResult<()> {
    let contents = toml::to_string_pretty(config)?;
    fs::write(path, contents)?;
    Ok(())
}
