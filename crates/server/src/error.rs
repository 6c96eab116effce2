//! Tool-argument errors for the waystation server.
//!
//! Failures from the cache and network layers arrive as
//! [`waystation_core::Error`] and convert on their own.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use waystation_client::UrlError;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// A tool argument is malformed.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The request URL could not be canonicalized.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(#[from] UrlError),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        McpError { code: ErrorCode(-32602), message: err.to_string().into(), data: None }
    }
}
