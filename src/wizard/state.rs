use crate::wizard::roster::Roster;
use serde::{Deserialize, Serialize};

pub const DEFAULT_REQUEST_DELAY: u32 = 2;
pub const DEFAULT_REQUEST_TIMEOUT: u32 = 60;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WizardStep {
    Configuration,
    Upload,
    Processing,
    Results,
}

pub const ALL_WIZARD_STEPS: [WizardStep; 4] = [
    WizardStep::Configuration,
    WizardStep::Upload,
    WizardStep::Processing,
    WizardStep::Results,
];

impl WizardStep {
    pub fn index(self) -> usize {
        match self {
            Self::Configuration => 0,
            Self::Upload => 1,
            Self::Processing => 2,
            Self::Results => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        ALL_WIZARD_STEPS.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Upload => "upload",
            Self::Processing => "processing",
            Self::Results => "results",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Configuration => "Configuration",
            Self::Upload => "Upload",
            Self::Processing => "Processing",
            Self::Results => "Results",
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn prev(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Results
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Credentials and tuning sent to the backend. Serializes to the camelCase
/// shape the backend reads from the `X-Groq-Config` header.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    pub api_key: String,
    pub model: String,
    pub request_delay: u32,
    pub request_timeout: u32,
    pub max_retries: u32,
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            request_delay: DEFAULT_REQUEST_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.model.trim().is_empty()
    }

    pub fn header_value(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("request_delay", &self.request_delay)
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct FileRef {
    pub name: String,
    pub size_bytes: u64,
    pub content: Vec<u8>,
}

impl FileRef {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size_bytes: content.len() as u64,
            content,
        }
    }
}

impl std::fmt::Debug for FileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRef")
            .field("name", &self.name)
            .field("size_bytes", &self.size_bytes)
            .finish_non_exhaustive()
    }
}

pub fn file_names(files: &[FileRef]) -> Vec<&str> {
    files.iter().map(|file| file.name.as_str()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub funcionarios_elegiveis: u64,
    pub valor_total_vr: f64,
    pub valor_empresa: f64,
    pub valor_funcionario: f64,
    pub tempo_processamento: String,
    #[serde(default)]
    pub arquivos_gerados: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sistema_usado: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metodo_calculo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fonte_dados: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WizardOptions {
    pub roster: Roster,
    pub auto_advance_min_files: Option<usize>,
}

/// The single owned session state. Views read it through accessors and
/// change it only through [`WizardState::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct WizardState {
    pub(super) options: WizardOptions,
    pub(super) current_step: WizardStep,
    pub(super) config: Option<ApiConfig>,
    pub(super) files: Vec<FileRef>,
    pub(super) processing: bool,
    pub(super) result: Option<ProcessingResult>,
    pub(super) error: Option<String>,
}

impl Default for WizardState {
    fn default() -> Self {
        Self::new(WizardOptions::default())
    }
}

impl WizardState {
    pub fn new(options: WizardOptions) -> Self {
        Self {
            options,
            current_step: WizardStep::Configuration,
            config: None,
            files: Vec::new(),
            processing: false,
            result: None,
            error: None,
        }
    }

    pub fn options(&self) -> &WizardOptions {
        &self.options
    }

    pub fn roster(&self) -> &Roster {
        &self.options.roster
    }

    pub fn current_step(&self) -> WizardStep {
        self.current_step
    }

    pub fn config(&self) -> Option<&ApiConfig> {
        self.config.as_ref()
    }

    pub fn files(&self) -> &[FileRef] {
        &self.files
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn result(&self) -> Option<&ProcessingResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Percentage shown in the header progress bar.
    pub fn progress_percent(&self) -> u16 {
        ((self.current_step.index() + 1) * 100 / ALL_WIZARD_STEPS.len()) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_indices_round_trip_and_saturate() {
        for step in ALL_WIZARD_STEPS {
            assert_eq!(WizardStep::from_index(step.index()), Some(step));
        }
        assert_eq!(WizardStep::Configuration.prev(), None);
        assert_eq!(WizardStep::Results.next(), None);
        assert_eq!(WizardStep::from_index(4), None);
    }

    #[test]
    fn api_config_debug_hides_the_key() {
        let config = ApiConfig::new("gsk_secret_value", "qwen/qwen3-32b");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("gsk_secret_value"));
        assert!(rendered.contains("qwen/qwen3-32b"));
    }

    #[test]
    fn api_config_header_uses_backend_field_names() {
        let header = ApiConfig::new("gsk_x", "llama-3.3-70b-versatile")
            .header_value()
            .expect("encode");
        let value: serde_json::Value = serde_json::from_str(&header).expect("json");
        assert_eq!(value["apiKey"], "gsk_x");
        assert_eq!(value["model"], "llama-3.3-70b-versatile");
        assert_eq!(value["requestDelay"], 2);
        assert_eq!(value["requestTimeout"], 60);
        assert_eq!(value["maxRetries"], 3);
    }

    #[test]
    fn processing_result_accepts_optional_metadata() {
        let result: ProcessingResult = serde_json::from_str(
            r#"{"status":"success","funcionarios_elegiveis":1791,"valor_total_vr":1004751.0,
                "valor_empresa":803800.8,"valor_funcionario":200950.2,
                "tempo_processamento":"45s","arquivos_gerados":["VR MENSAL 05.2025.xlsx"],
                "sistema_usado":"FinaCrew"}"#,
        )
        .expect("parse");
        assert_eq!(result.funcionarios_elegiveis, 1791);
        assert_eq!(result.status.as_deref(), Some("success"));
        assert_eq!(result.sistema_usado.as_deref(), Some("FinaCrew"));
        assert!(result.fonte_dados.is_none());
    }

    #[test]
    fn progress_tracks_current_step() {
        let state = WizardState::default();
        assert_eq!(state.progress_percent(), 25);
    }
}
