use super::error::{error_message_from_body, truncate_chars};
use super::multipart::encode_files;
use super::types::{FilesResponse, UploadResponse};
use super::{
    BackendError, ConnectionCheck, DefaultCheck, GeneratedFile, HealthStatus, UploadedFile,
    WizardBackend,
};
use crate::config::Settings;
use crate::wizard::state::{ApiConfig, FileRef, ProcessingResult};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::time::Duration;

pub const GROQ_CONFIG_HEADER: &str = "X-Groq-Config";
const MAX_DOWNLOAD_BYTES: u64 = 256 * 1024 * 1024;

/// Blocking client for the FinaCrew backend. Processing gets its own agent
/// so its long timeout does not leak into the short calls.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    agent: ureq::Agent,
    request_timeout: Duration,
    process_agent: ureq::Agent,
    process_timeout: Duration,
}

impl BackendClient {
    pub fn new(base_url: &str, request_timeout: Duration, process_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new().timeout(request_timeout).build(),
            request_timeout,
            process_agent: ureq::AgentBuilder::new().timeout(process_timeout).build(),
            process_timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.effective_backend_url(),
            settings.request_timeout(),
            settings.process_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn process_timeout(&self) -> Duration {
        self.process_timeout
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let url = self.endpoint(path);
        let result = self.agent.get(&url).set("accept", "application/json").call();
        let response = map_call(&url, result, self.request_timeout)?;
        read_json(&url, response)
    }

    /// Like `get_json`, but error statuses with a JSON body still decode.
    fn get_json_any_status<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let url = self.endpoint(path);
        match self.agent.get(&url).set("accept", "application/json").call() {
            Ok(response) | Err(ureq::Error::Status(_, response)) => read_json(&url, response),
            Err(ureq::Error::Transport(transport)) => {
                Err(map_transport(&url, &transport, self.request_timeout))
            }
        }
    }
}

impl WizardBackend for BackendClient {
    fn test_config(&self, config: &ApiConfig) -> Result<ConnectionCheck, BackendError> {
        let url = self.endpoint("api/test-groq-config");
        let body = serde_json::to_value(config).map_err(|e| BackendError::Encode(e.to_string()))?;
        let result = self.agent.post(&url).send_json(body);
        let response = map_call(&url, result, self.request_timeout)?;
        let check: ConnectionCheck = read_json(&url, response)?;
        match check.status.as_deref() {
            Some("success") => Ok(check),
            _ => Err(BackendError::Application(
                check
                    .message
                    .unwrap_or_else(|| "connection test did not report success".to_string()),
            )),
        }
    }

    fn test_default(&self) -> Result<DefaultCheck, BackendError> {
        self.get_json_any_status("api/test-groq")
    }

    fn upload(
        &self,
        files: &[FileRef],
        config: Option<&ApiConfig>,
    ) -> Result<Vec<UploadedFile>, BackendError> {
        let url = self.endpoint("api/upload");
        let multipart = encode_files(files)?;
        let mut request = self
            .agent
            .post(&url)
            .set("content-type", &multipart.content_type());
        if let Some(config) = config {
            let header = config
                .header_value()
                .map_err(|e| BackendError::Encode(e.to_string()))?;
            request = request.set(GROQ_CONFIG_HEADER, &header);
        }
        let result = request.send_bytes(&multipart.body);
        let response = map_call(&url, result, self.request_timeout)?;
        let uploaded: UploadResponse = read_json(&url, response)?;
        Ok(uploaded.files)
    }

    fn process(&self, config: &ApiConfig) -> Result<ProcessingResult, BackendError> {
        let url = self.endpoint("api/process");
        let header = config
            .header_value()
            .map_err(|e| BackendError::Encode(e.to_string()))?;
        let result = self
            .process_agent
            .post(&url)
            .set("content-type", "application/json")
            .set(GROQ_CONFIG_HEADER, &header)
            .send_string("{}");
        let response = map_call(&url, result, self.process_timeout)?;
        let body = read_text(&url, response)?;
        parse_processing_result(&url, &body)
    }

    fn list_files(&self) -> Result<Vec<GeneratedFile>, BackendError> {
        let listing: FilesResponse = self.get_json("api/files")?;
        Ok(listing.files)
    }

    fn download(&self, name: &str) -> Result<Vec<u8>, BackendError> {
        let url = self.endpoint(&format!("api/download/{}", urlencoding::encode(name)));
        let result = self.agent.get(&url).call();
        let response = map_call(&url, result, self.request_timeout)?;
        read_capped(&url, response.into_reader(), MAX_DOWNLOAD_BYTES)
    }

    fn health(&self) -> Result<HealthStatus, BackendError> {
        self.get_json("api/health")
    }
}

/// Decodes a `/api/process` body. A body that carries `error` without a
/// `success` status is treated as an application failure.
pub fn parse_processing_result(url: &str, body: &str) -> Result<ProcessingResult, BackendError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| BackendError::Malformed {
            url: url.to_string(),
            detail: format!("{e}; body: {}", truncate_chars(body.trim(), 200)),
        })?;
    let status = value.get("status").and_then(|v| v.as_str());
    if status != Some("success") && (status.is_some() || value.get("error").is_some()) {
        return Err(BackendError::Application(error_message_from_body(body)));
    }
    serde_json::from_value(value).map_err(|e| BackendError::Malformed {
        url: url.to_string(),
        detail: e.to_string(),
    })
}

fn map_call(
    url: &str,
    result: Result<ureq::Response, ureq::Error>,
    timeout: Duration,
) -> Result<ureq::Response, BackendError> {
    match result {
        Ok(response) => Ok(response),
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            Err(BackendError::Status {
                status,
                message: error_message_from_body(&body),
            })
        }
        Err(ureq::Error::Transport(transport)) => Err(map_transport(url, &transport, timeout)),
    }
}

fn map_transport(url: &str, transport: &ureq::Transport, timeout: Duration) -> BackendError {
    if is_timeout(transport) {
        BackendError::Timeout {
            url: url.to_string(),
            seconds: timeout.as_secs(),
        }
    } else {
        BackendError::Connection {
            url: url.to_string(),
            message: transport.to_string(),
        }
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    let mut source = std::error::Error::source(transport);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ) {
                return true;
            }
        }
        source = err.source();
    }
    transport.to_string().contains("timed out")
}

/// Reads at most `limit` bytes. A longer body is an error, never a
/// truncated file.
fn read_capped(url: &str, reader: impl Read, limit: u64) -> Result<Vec<u8>, BackendError> {
    let mut bytes = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|source| BackendError::Io {
            url: url.to_string(),
            source,
        })?;
    if bytes.len() as u64 > limit {
        return Err(BackendError::TooLarge {
            url: url.to_string(),
            limit_bytes: limit,
        });
    }
    Ok(bytes)
}

fn read_text(url: &str, response: ureq::Response) -> Result<String, BackendError> {
    response.into_string().map_err(|source| BackendError::Io {
        url: url.to_string(),
        source,
    })
}

fn read_json<T: DeserializeOwned>(url: &str, response: ureq::Response) -> Result<T, BackendError> {
    let body = read_text(url, response)?;
    serde_json::from_str(&body).map_err(|e| BackendError::Malformed {
        url: url.to_string(),
        detail: format!("{e}; body: {}", truncate_chars(body.trim(), 200)),
    })
}
