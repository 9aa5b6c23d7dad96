use super::{ConfigError, Preferences, Settings};
use crate::runtime::StatePaths;
use std::fs;

/// Loads `config.yaml` from the state root. A missing file means defaults.
pub fn load_settings(paths: &StatePaths) -> Result<Settings, ConfigError> {
    let path = paths.settings_file();
    if !path.exists() {
        return Ok(Settings::default());
    }
    let settings = Settings::from_path(&path)?;
    settings.validate()?;
    Ok(settings)
}

pub fn load_preferences(paths: &StatePaths) -> Result<Preferences, ConfigError> {
    let path = paths.preferences_path();
    if !path.exists() {
        return Ok(Preferences::default());
    }
    let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}
