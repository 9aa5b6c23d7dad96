#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend unreachable at {url}: {message}")]
    Connection { url: String, message: String },
    #[error("request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },
    #[error("backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("backend reported an error: {0}")]
    Application(String),
    #[error("unexpected response from {url}: {detail}")]
    Malformed { url: String, detail: String },
    #[error("failed to read response from {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("response from {url} exceeds the {limit_bytes} byte limit")]
    TooLarge { url: String, limit_bytes: u64 },
    #[error("failed to encode request: {0}")]
    Encode(String),
}

impl BackendError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The backend's own wording, when it sent one.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } | Self::Application(message) => Some(message),
            _ => None,
        }
    }
}

const GENERIC_FAILURE: &str = "request failed without details";
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Pulls a human message out of an error body: the JSON `error` field when
/// present, otherwise the raw text, otherwise a generic message.
pub fn error_message_from_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return GENERIC_FAILURE.to_string();
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(error) = value.get("error").and_then(|v| v.as_str()) {
            let error = error.trim();
            if !error.is_empty() {
                return error.to_string();
            }
        }
        if let Some(message) = value.get("message").and_then(|v| v.as_str()) {
            if !message.trim().is_empty() {
                return message.trim().to_string();
            }
        }
    }
    truncate_chars(trimmed, MAX_ERROR_BODY_CHARS)
}

pub(crate) fn truncate_chars(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
