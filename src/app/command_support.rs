use crate::backend::BackendClient;
use crate::config::{load_preferences, load_settings, ConfigError, Settings};
use crate::runtime::{ensure_state_root, RuntimeLog, StatePaths};
use crate::wizard::configuration::{ConfigDraft, DEFAULT_API_KEY_ENV};
use crate::wizard::state::ApiConfig;
use std::path::PathBuf;

/// State root, settings and log shared by every command.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub paths: StatePaths,
    pub settings: Settings,
    pub log: RuntimeLog,
}

impl CommandContext {
    pub fn backend(&self) -> BackendClient {
        BackendClient::from_settings(&self.settings)
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.settings.downloads_dir(&self.paths.downloads_dir())
    }

    /// Draft seeded from saved preferences. A broken preferences file is
    /// logged and ignored.
    pub fn draft(&self) -> ConfigDraft {
        let mut draft = ConfigDraft::default();
        match load_preferences(&self.paths) {
            Ok(prefs) => draft.apply_preferences(&prefs),
            Err(err) => self.log.warn("wizard.preferences_unreadable", &err.to_string()),
        }
        draft
    }
}

pub fn map_config_err(err: ConfigError) -> String {
    err.to_string()
}

pub fn load_context() -> Result<CommandContext, String> {
    let paths = ensure_state_root().map_err(|e| e.to_string())?;
    let settings = load_settings(&paths).map_err(map_config_err)?;
    let log = RuntimeLog::new(paths.clone());
    Ok(CommandContext {
        paths,
        settings,
        log,
    })
}

/// Config for headless commands: key from the environment, everything else
/// from saved preferences.
pub fn headless_api_config(context: &CommandContext) -> Result<ApiConfig, String> {
    let mut draft = context.draft();
    let key = std::env::var(DEFAULT_API_KEY_ENV).unwrap_or_default();
    draft.set_api_key(&key).map_err(|e| e.to_string())?;
    draft.validate().map_err(|_| {
        format!("{DEFAULT_API_KEY_ENV} is not set; export the Groq API key before running this command")
    })?;
    Ok(draft.to_api_config())
}

/// Splits `--flag value` pairs out of positional arguments.
pub fn take_flag(args: &[String], flag: &str) -> Result<(Vec<String>, Option<String>), String> {
    let mut positional = Vec::new();
    let mut value = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == flag {
            let Some(next) = iter.next() else {
                return Err(format!("`{flag}` requires a value"));
            };
            value = Some(next.clone());
        } else {
            positional.push(arg.clone());
        }
    }
    Ok((positional, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_flag_separates_values() {
        let args = vec![
            "VR.xlsx".to_string(),
            "--out".to_string(),
            "/tmp/x".to_string(),
        ];
        let (positional, out) = take_flag(&args, "--out").expect("parse");
        assert_eq!(positional, vec!["VR.xlsx"]);
        assert_eq!(out.as_deref(), Some("/tmp/x"));

        assert!(take_flag(&["--out".to_string()], "--out").is_err());
    }
}
