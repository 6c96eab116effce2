//! MCP tool implementations.
//!
//! This module contains all tools exposed by the waystation server.

pub mod cache;
pub mod fetch;
pub mod message;

pub use cache::{CacheKeysParams, CacheVersionsParams};
pub use fetch::SwFetchParams;
pub use message::SwMessageParams;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use waystation_core::Error;

/// Pretty-printed JSON as a single text content block.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::Serialization(format!("failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod test_util {
    use rmcp::model::CallToolResult;
    use serde::de::DeserializeOwned;

    pub fn parse_output<T: DeserializeOwned>(result: &CallToolResult) -> T {
        let content = serde_json::to_value(&result.content[0]).unwrap();
        let text = content.get("text").and_then(|v| v.as_str()).expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}
