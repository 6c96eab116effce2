//! sw_fetch tool implementation.
//!
//! Routes a request through the interceptor exactly as an application fetch
//! would go, and reports which route class and strategy served it.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use waystation_client::{Interceptor, canonicalize};
use waystation_core::{Request, RequestMode, RouteClass};

use super::json_result;
use crate::error::ToolError;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET). Anything other than GET passes through.
    #[serde(default = "default_method")]
    pub method: String,

    /// Treat the request as a page navigation.
    #[serde(default)]
    pub navigate: bool,

    /// Extra request headers forwarded to the network.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    pub method: String,
    /// Route class the request fell into.
    pub class: RouteClass,
    /// Strategy that served it; absent for passthrough.
    pub strategy: Option<String>,
    /// "network", "cache" or "passthrough".
    pub source: String,
    /// Cache version the strategy ran against; absent for passthrough.
    pub version: Option<String>,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body as text when it is valid UTF-8.
    pub body: Option<String>,
    pub body_bytes: usize,
}

fn validate_method(method: &str) -> Result<&str, ToolError> {
    let method = method.trim();
    if method.is_empty() || !method.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(ToolError::InvalidInput(format!("invalid method: {method:?}")));
    }
    Ok(method)
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(interceptor: &Interceptor, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let method = validate_method(&params.method)?;
    let url = canonicalize(&params.url, interceptor.classifier().origin()).map_err(ToolError::from)?;

    let mut request = Request::new(method, url);
    if params.navigate {
        request.mode = RequestMode::Navigate;
    }
    for (name, value) in params.headers {
        request = request.with_header(name, value);
    }

    let served = interceptor.respond(&request).await?;
    let response = served.response;

    let output = SwFetchOutput {
        url: request.url().to_string(),
        method: request.method().to_string(),
        class: served.class,
        strategy: served.strategy.map(|s| s.as_str().to_string()),
        source: served.source.as_str().to_string(),
        version: served.version.map(|v| v.to_string()),
        status: response.status,
        content_type: response.content_type().map(str::to_string),
        body: std::str::from_utf8(&response.body).ok().map(str::to_string),
        body_bytes: response.body.len(),
        headers: response.headers,
    };

    json_result(&output)
}
