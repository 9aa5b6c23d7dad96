use crate::wizard::configuration::ConfigDraft;
use serde::{Deserialize, Serialize};

/// Non-secret tuning cache kept between sessions. The API key has no field
/// here, so it cannot reach disk through this type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_delay: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

impl Preferences {
    /// Model and tuning from a draft. The key is left behind.
    pub fn from_draft(draft: &ConfigDraft) -> Self {
        Self {
            model: Some(draft.model.clone()),
            request_delay: Some(draft.request_delay),
            request_timeout: Some(draft.request_timeout),
            max_retries: Some(draft.max_retries),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
