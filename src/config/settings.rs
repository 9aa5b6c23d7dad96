use super::ConfigError;
use crate::wizard::roster::DEFAULT_REQUIRED_FILES;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5001";
pub const BACKEND_URL_ENV: &str = "FINACREW_BACKEND_URL";
pub const DEFAULT_PROCESS_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub backend_url: String,
    pub process_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_upload_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_advance_min_files: Option<usize>,
    pub sync_before_process: bool,
    pub required_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloads_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            process_timeout_secs: DEFAULT_PROCESS_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            auto_advance_min_files: None,
            sync_before_process: false,
            required_files: DEFAULT_REQUIRED_FILES
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
            downloads_path: None,
        }
    }
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.backend_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Settings(
                "`backend_url` must start with http:// or https://".to_string(),
            ));
        }
        if self.process_timeout_secs == 0 {
            return Err(ConfigError::Settings(
                "`process_timeout_secs` must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Settings(
                "`request_timeout_secs` must be greater than zero".to_string(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Settings(
                "`max_upload_bytes` must be greater than zero".to_string(),
            ));
        }
        if self.required_files.is_empty() {
            return Err(ConfigError::Settings(
                "`required_files` must list at least one file".to_string(),
            ));
        }
        if let Some(entry) = self.required_files.iter().find(|v| v.trim().is_empty()) {
            return Err(ConfigError::Settings(format!(
                "`required_files` contains an empty entry `{entry}`"
            )));
        }
        if self.auto_advance_min_files == Some(0) {
            return Err(ConfigError::Settings(
                "`auto_advance_min_files` must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Backend base URL with the environment override applied.
    pub fn effective_backend_url(&self) -> String {
        std::env::var(BACKEND_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.backend_url.clone())
            .trim()
            .trim_end_matches('/')
            .to_string()
    }

    pub fn process_timeout(&self) -> Duration {
        Duration::from_secs(self.process_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn downloads_dir(&self, fallback: &Path) -> PathBuf {
        self.downloads_path
            .clone()
            .unwrap_or_else(|| fallback.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let settings: Settings = serde_yaml::from_str("{}").expect("parse");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.max_upload_bytes, 16 * 1024 * 1024);
        assert_eq!(settings.required_files.len(), 5);
        settings.validate().expect("defaults are valid");
    }

    #[test]
    fn partial_yaml_keeps_remaining_defaults() {
        let settings: Settings = serde_yaml::from_str(
            r#"
backend_url: https://finacrew.internal:8443/
process_timeout_secs: 1200
auto_advance_min_files: 5
"#,
        )
        .expect("parse");
        assert_eq!(settings.process_timeout(), Duration::from_secs(1200));
        assert_eq!(settings.auto_advance_min_files, Some(5));
        assert_eq!(settings.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert!(!settings.sync_before_process);
        settings.validate().expect("valid");
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut settings = Settings {
            backend_url: "ftp://nope".to_string(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        settings.backend_url = DEFAULT_BACKEND_URL.to_string();
        settings.process_timeout_secs = 0;
        assert!(settings.validate().is_err());

        settings.process_timeout_secs = 600;
        settings.required_files.clear();
        let err = settings.validate().expect_err("empty roster");
        assert!(err.to_string().contains("required_files"));

        settings.required_files = vec!["ATIVOS.xlsx".to_string()];
        settings.auto_advance_min_files = Some(0);
        assert!(settings.validate().is_err());
    }
}
