use crate::backend::{BackendError, WizardBackend};
use crate::config::Preferences;
use crate::wizard::navigation::WizardCommand;
use crate::wizard::state::{
    ApiConfig, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_DELAY, DEFAULT_REQUEST_TIMEOUT,
};
use std::ops::RangeInclusive;

pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Models the backend is known to work with, most capable first.
pub const MODEL_OPTIONS: [&str; 4] = [
    "meta-llama/llama-4-maverick-17b-128e-instruct",
    "deepseek-r1-distill-llama-70b",
    "qwen/qwen3-32b",
    "llama-3.3-70b-versatile",
];

pub const DEFAULT_MODEL: &str = MODEL_OPTIONS[0];
/// Model paired with the built-in key; the backend tests it on `/api/test-groq`.
pub const PRETESTED_MODEL: &str = "llama-3.3-70b-versatile";

pub const REQUEST_DELAY_RANGE: RangeInclusive<u32> = 1..=10;
pub const REQUEST_TIMEOUT_RANGE: RangeInclusive<u32> = 30..=300;
pub const MAX_RETRIES_RANGE: RangeInclusive<u32> = 1..=10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("API key is required")]
    MissingApiKey,
    #[error("model `{0}` is not supported; choose one of: {models}", models = MODEL_OPTIONS.join(", "))]
    UnsupportedModel(String),
    #[error("the built-in configuration is active; turn it off to edit")]
    LockedByDefault,
    #[error("the built-in configuration needs GROQ_API_KEY in the environment")]
    DefaultKeyUnavailable,
    #[error("{0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningField {
    RequestDelay,
    RequestTimeout,
    MaxRetries,
}

impl TuningField {
    pub fn label(self) -> &'static str {
        match self {
            Self::RequestDelay => "Request delay (s)",
            Self::RequestTimeout => "Request timeout (s)",
            Self::MaxRetries => "Max retries",
        }
    }

    fn range(self) -> RangeInclusive<u32> {
        match self {
            Self::RequestDelay => REQUEST_DELAY_RANGE,
            Self::RequestTimeout => REQUEST_TIMEOUT_RANGE,
            Self::MaxRetries => MAX_RETRIES_RANGE,
        }
    }
}

/// Editable copy of the API configuration. Nothing here touches the wizard
/// state until [`ConfigDraft::submit`] hands back a command.
#[derive(Clone, PartialEq, Eq)]
pub struct ConfigDraft {
    pub api_key: String,
    pub model: String,
    pub request_delay: u32,
    pub request_timeout: u32,
    pub max_retries: u32,
    use_default: bool,
    saved_before_default: Option<Box<ConfigDraft>>,
}

impl Default for ConfigDraft {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            request_delay: DEFAULT_REQUEST_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            use_default: false,
            saved_before_default: None,
        }
    }
}

impl std::fmt::Debug for ConfigDraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigDraft")
            .field("api_key", &mask_api_key(&self.api_key))
            .field("model", &self.model)
            .field("request_delay", &self.request_delay)
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .field("use_default", &self.use_default)
            .finish()
    }
}

impl ConfigDraft {
    pub fn from_config(config: &ApiConfig) -> Self {
        let mut draft = Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            ..Self::default()
        };
        draft.set_tuning(TuningField::RequestDelay, config.request_delay);
        draft.set_tuning(TuningField::RequestTimeout, config.request_timeout);
        draft.set_tuning(TuningField::MaxRetries, config.max_retries);
        draft
    }

    pub fn use_default(&self) -> bool {
        self.use_default
    }

    /// Restores saved model and tuning. Unknown models are ignored and
    /// out-of-range values are clamped.
    pub fn apply_preferences(&mut self, preferences: &Preferences) {
        if let Some(model) = preferences.model.as_deref() {
            if is_supported_model(model) {
                self.model = model.to_string();
            }
        }
        if let Some(value) = preferences.request_delay {
            self.set_tuning(TuningField::RequestDelay, value);
        }
        if let Some(value) = preferences.request_timeout {
            self.set_tuning(TuningField::RequestTimeout, value);
        }
        if let Some(value) = preferences.max_retries {
            self.set_tuning(TuningField::MaxRetries, value);
        }
    }

    pub fn to_preferences(&self) -> Preferences {
        Preferences::from_draft(self)
    }

    pub fn set_api_key(&mut self, value: &str) -> Result<(), ConfigurationError> {
        self.ensure_editable()?;
        self.api_key = value.trim().to_string();
        Ok(())
    }

    pub fn set_model(&mut self, model: &str) -> Result<(), ConfigurationError> {
        self.ensure_editable()?;
        let model = model.trim();
        if !is_supported_model(model) {
            return Err(ConfigurationError::UnsupportedModel(model.to_string()));
        }
        self.model = model.to_string();
        Ok(())
    }

    /// Moves to the next model in the allow-list, wrapping at the end.
    pub fn cycle_model(&mut self) -> Result<&str, ConfigurationError> {
        self.ensure_editable()?;
        let next = MODEL_OPTIONS
            .iter()
            .position(|model| *model == self.model)
            .map(|idx| (idx + 1) % MODEL_OPTIONS.len())
            .unwrap_or(0);
        self.model = MODEL_OPTIONS[next].to_string();
        Ok(&self.model)
    }

    pub fn set_tuning(&mut self, field: TuningField, value: u32) -> u32 {
        let range = field.range();
        let clamped = value.clamp(*range.start(), *range.end());
        match field {
            TuningField::RequestDelay => self.request_delay = clamped,
            TuningField::RequestTimeout => self.request_timeout = clamped,
            TuningField::MaxRetries => self.max_retries = clamped,
        }
        clamped
    }

    pub fn tuning(&self, field: TuningField) -> u32 {
        match field {
            TuningField::RequestDelay => self.request_delay,
            TuningField::RequestTimeout => self.request_timeout,
            TuningField::MaxRetries => self.max_retries,
        }
    }

    pub fn edit_tuning(&mut self, field: TuningField, value: u32) -> Result<u32, ConfigurationError> {
        self.ensure_editable()?;
        Ok(self.set_tuning(field, value))
    }

    pub fn step_tuning(&mut self, field: TuningField, delta: i64) -> Result<u32, ConfigurationError> {
        let current = i64::from(self.tuning(field));
        let next = (current + delta).clamp(0, i64::from(u32::MAX)) as u32;
        self.edit_tuning(field, next)
    }

    /// Switches the built-in configuration on or off. Turning it on replaces
    /// the draft with the environment key and the pretested model; turning
    /// it off restores what was there before.
    pub fn set_use_default(&mut self, enabled: bool) -> Result<(), ConfigurationError> {
        self.set_use_default_with_key(enabled, default_api_key())
    }

    pub fn set_use_default_with_key(
        &mut self,
        enabled: bool,
        default_key: Option<String>,
    ) -> Result<(), ConfigurationError> {
        if enabled == self.use_default {
            return Ok(());
        }
        if enabled {
            let key = default_key.ok_or(ConfigurationError::DefaultKeyUnavailable)?;
            let saved = Box::new(self.clone());
            *self = Self {
                api_key: key,
                model: PRETESTED_MODEL.to_string(),
                use_default: true,
                saved_before_default: Some(saved),
                ..Self::default()
            };
        } else {
            *self = match self.saved_before_default.take() {
                Some(saved) => *saved,
                None => Self::default(),
            };
            self.use_default = false;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigurationError::MissingApiKey);
        }
        if !is_supported_model(&self.model) {
            return Err(ConfigurationError::UnsupportedModel(self.model.clone()));
        }
        Ok(())
    }

    pub fn to_api_config(&self) -> ApiConfig {
        ApiConfig {
            api_key: self.api_key.trim().to_string(),
            model: self.model.clone(),
            request_delay: self.request_delay,
            request_timeout: self.request_timeout,
            max_retries: self.max_retries,
        }
    }

    pub fn submit(&self) -> Result<WizardCommand, ConfigurationError> {
        self.validate()?;
        Ok(WizardCommand::SetConfig(self.to_api_config()))
    }

    /// Checks key and model against the backend. The wizard state is not
    /// touched; an empty key fails before any request is made.
    pub fn test_connection(
        &self,
        backend: &dyn WizardBackend,
    ) -> Result<String, ConfigurationError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigurationError::MissingApiKey);
        }
        let check = backend
            .test_config(&self.to_api_config())
            .map_err(|err| ConfigurationError::Backend(friendly_backend_error(&err)))?;
        let model = check.model_used.unwrap_or_else(|| self.model.clone());
        Ok(match check.message {
            Some(message) if !message.trim().is_empty() => format!("{message} (model: {model})"),
            _ => format!("Connection OK (model: {model})"),
        })
    }

    fn ensure_editable(&self) -> Result<(), ConfigurationError> {
        if self.use_default {
            Err(ConfigurationError::LockedByDefault)
        } else {
            Ok(())
        }
    }
}

pub fn test_default_connection(backend: &dyn WizardBackend) -> Result<String, ConfigurationError> {
    let check = backend
        .test_default()
        .map_err(|err| ConfigurationError::Backend(friendly_backend_error(&err)))?;
    let message = check
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| "no details from backend".to_string());
    if check.groq_working {
        Ok(message)
    } else {
        Err(ConfigurationError::Backend(friendly_error(&message)))
    }
}

pub fn is_supported_model(model: &str) -> bool {
    MODEL_OPTIONS.contains(&model)
}

pub fn default_api_key() -> Option<String> {
    std::env::var(DEFAULT_API_KEY_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Shows the first and last four characters of a key.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.is_empty() {
        return "<empty>".to_string();
    }
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

const INVALID_KEY_HINT: &str = "Invalid or expired API key. Check the key in the Groq console.";
const ACCESS_DENIED_HINT: &str = "Access denied. The key has no permission for this model.";
const RATE_LIMIT_HINT: &str = "Rate limit reached. Wait a moment and try again.";

/// Actionable text for the HTTP statuses the provider uses for key and
/// quota problems.
pub fn status_hint(status: u16) -> Option<&'static str> {
    match status {
        401 => Some(INVALID_KEY_HINT),
        403 => Some(ACCESS_DENIED_HINT),
        429 => Some(RATE_LIMIT_HINT),
        _ => None,
    }
}

/// Rewrites provider errors users hit often into actionable text. Status
/// codes only count as whole tokens; anything unrecognised is returned
/// verbatim.
pub fn friendly_error(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    if lowered.contains("invalid api key") {
        return INVALID_KEY_HINT.to_string();
    }
    let coded = raw
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| token.len() == 3)
        .filter_map(|token| token.parse::<u16>().ok())
        .find_map(status_hint);
    if let Some(hint) = coded {
        hint.to_string()
    } else if lowered.contains("rate limit") || lowered.contains("too many requests") {
        RATE_LIMIT_HINT.to_string()
    } else {
        raw.to_string()
    }
}

fn friendly_backend_error(err: &BackendError) -> String {
    if let Some(hint) = err.status().and_then(status_hint) {
        return hint.to_string();
    }
    match (err.status(), err.backend_message()) {
        (Some(status), Some(message)) => {
            format!("Server error {status} - {}", friendly_error(message))
        }
        (None, Some(message)) => friendly_error(message),
        _ => err.to_string(),
    }
}
