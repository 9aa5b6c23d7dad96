use super::{ConfigError, Preferences, Settings};
use crate::runtime::StatePaths;
use crate::shared::fs_atomic::atomic_write_file;
use serde::Serialize;
use std::path::{Path, PathBuf};

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    let body = serde_yaml::to_string(value).map_err(|source| ConfigError::Encode {
        path: path.display().to_string(),
        source,
    })?;
    atomic_write_file(path, body.as_bytes()).map_err(|source| ConfigError::Write {
        path: path.display().to_string(),
        source,
    })
}

pub fn save_settings(paths: &StatePaths, settings: &Settings) -> Result<PathBuf, ConfigError> {
    settings.validate()?;
    let path = paths.settings_file();
    write_yaml(&path, settings)?;
    Ok(path)
}

pub fn save_preferences(
    paths: &StatePaths,
    preferences: &Preferences,
) -> Result<PathBuf, ConfigError> {
    let path = paths.preferences_path();
    write_yaml(&path, preferences)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_preferences, load_settings};
    use tempfile::tempdir;

    #[test]
    fn preferences_round_trip_through_state_root() {
        let temp = tempdir().expect("tempdir");
        let paths = StatePaths::new(temp.path().join(".finacrew"));
        let prefs = Preferences {
            model: Some("qwen/qwen3-32b".to_string()),
            request_delay: Some(4),
            request_timeout: None,
            max_retries: Some(2),
        };

        save_preferences(&paths, &prefs).expect("save");

        assert_eq!(load_preferences(&paths).expect("load"), prefs);
    }

    #[test]
    fn missing_files_load_as_defaults() {
        let temp = tempdir().expect("tempdir");
        let paths = StatePaths::new(temp.path().join(".finacrew"));

        assert_eq!(load_settings(&paths).expect("settings"), Settings::default());
        assert!(load_preferences(&paths).expect("prefs").is_empty());
    }

    #[test]
    fn save_settings_refuses_invalid_values() {
        let temp = tempdir().expect("tempdir");
        let paths = StatePaths::new(temp.path().join(".finacrew"));
        let settings = Settings {
            request_timeout_secs: 0,
            ..Settings::default()
        };

        assert!(save_settings(&paths, &settings).is_err());
        assert!(!paths.settings_file().exists());
    }
}
