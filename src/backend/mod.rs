pub mod api;
pub mod error;
pub mod multipart;
pub mod types;

pub use api::{BackendClient, GROQ_CONFIG_HEADER};
pub use error::{error_message_from_body, BackendError};
pub use types::{ConnectionCheck, DefaultCheck, GeneratedFile, HealthStatus, UploadedFile};

use crate::wizard::state::{ApiConfig, FileRef, ProcessingResult};

/// Everything the wizard asks of the processing backend. Views depend on
/// this trait so tests can swap in a scripted double.
pub trait WizardBackend: Send + Sync {
    fn test_config(&self, config: &ApiConfig) -> Result<ConnectionCheck, BackendError>;

    fn test_default(&self) -> Result<DefaultCheck, BackendError>;

    /// Sends every file in one multipart request. The config header is
    /// attached when present.
    fn upload(
        &self,
        files: &[FileRef],
        config: Option<&ApiConfig>,
    ) -> Result<Vec<UploadedFile>, BackendError>;

    fn process(&self, config: &ApiConfig) -> Result<ProcessingResult, BackendError>;

    fn list_files(&self) -> Result<Vec<GeneratedFile>, BackendError>;

    fn download(&self, name: &str) -> Result<Vec<u8>, BackendError>;

    fn health(&self) -> Result<HealthStatus, BackendError>;
}
