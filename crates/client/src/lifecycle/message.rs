//! Messages delivered to the lifecycle controller by open clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, thiserror::Error)]
pub enum MessageError {
    #[error("unrecognized client message: {0}")]
    Unrecognized(String),
}

/// Recognised client messages, tagged by their `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Finish activating the waiting version.
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
}

impl ClientMessage {
    pub fn parse(value: &Value) -> Result<Self, MessageError> {
        Self::deserialize(value).map_err(|e| MessageError::Unrecognized(format!("{value} ({e})")))
    }
}
