//! sw_message tool implementation.
//!
//! Delivers a client message to the lifecycle controller. This is the
//! update-signal channel: `{"type": "SKIP_WAITING"}` activates a waiting
//! version, anything else is ignored.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use waystation_client::{ActivateReport, ClientMessage, LifecycleController};

use super::json_result;

/// Input parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message payload, e.g. `{"type": "SKIP_WAITING"}`.
    pub message: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivationOutput {
    /// Stale versions deleted during activation.
    pub deleted: Vec<String>,
    /// Open clients now controlled by the current version.
    pub claimed: usize,
}

impl From<ActivateReport> for ActivationOutput {
    fn from(report: ActivateReport) -> Self {
        Self { deleted: report.deleted.iter().map(ToString::to_string).collect(), claimed: report.claimed }
    }
}

/// Output structure for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageOutput {
    /// Whether the message shape was recognised.
    pub recognized: bool,
    /// Lifecycle state after handling the message.
    pub state: String,
    /// Present when the message caused an activation.
    pub activation: Option<ActivationOutput>,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(lifecycle: &LifecycleController, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let recognized = ClientMessage::parse(&params.message).is_ok();
    let activation = lifecycle.on_message(&params.message).await;

    let output = SwMessageOutput {
        recognized,
        state: lifecycle.state().to_string(),
        activation: activation.map(ActivationOutput::from),
    };

    json_result(&output)
}
