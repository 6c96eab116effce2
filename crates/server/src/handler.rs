//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{keys_impl, versions_impl};
use crate::tools::fetch::fetch_impl;
use crate::tools::message::message_impl;
use crate::tools::{CacheKeysParams, CacheVersionsParams, SwFetchParams, SwMessageParams};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use waystation_client::{Interceptor, LifecycleController};
use waystation_core::CacheDb;

/// The main MCP server handler for waystation.
#[derive(Clone)]
pub struct WaystationServer {
    tool_router: ToolRouter<Self>,
    interceptor: Arc<Interceptor>,
    lifecycle: Arc<LifecycleController>,
    db: CacheDb,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl WaystationServer {
    /// Create a new server handler.
    pub fn new(interceptor: Arc<Interceptor>, lifecycle: Arc<LifecycleController>, db: CacheDb) -> Self {
        Self { tool_router: Self::tool_router(), interceptor, lifecycle, db }
    }

    #[tool(
        description = "Route a request through the caching layer. Returns the response together with its route class, strategy and source (network, cache or passthrough)."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.interceptor, params.0).await
    }

    #[tool(
        description = "Deliver a client message to the lifecycle controller. {\"type\": \"SKIP_WAITING\"} activates a waiting version; other messages are ignored."
    )]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.lifecycle, params.0).await
    }

    #[tool(description = "List cache versions on the device, with entry counts, the current version and lifecycle state.")]
    async fn cache_versions(&self, params: Parameters<CacheVersionsParams>) -> Result<CallToolResult, McpError> {
        versions_impl(&self.db, &self.lifecycle, params.0).await
    }

    #[tool(description = "List the request descriptors stored in a cache version (default: current).")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(&self.db, self.lifecycle.version(), params.0).await
    }
}

impl ServerHandler for WaystationServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "waystation".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
