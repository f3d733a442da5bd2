//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{CacheDeleteParams, CacheKeysParams, delete_impl, keys_impl};
use crate::tools::gate_fetch::{GateFetchParams, fetch_impl};
use crate::tools::lifecycle::{
    GateActivateParams, GateInstallParams, GateStatusParams, activate_impl, install_impl, status_impl,
};

use ghoststock_client::{Gatekeeper, HttpNetwork};
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

/// The MCP server handler hosting one gatekeeper.
#[derive(Clone)]
pub struct GateServer {
    gate: Arc<Gatekeeper<HttpNetwork>>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl GateServer {
    /// Create a new server handler.
    pub fn new(gate: Arc<Gatekeeper<HttpNetwork>>) -> Self {
        Self { gate, tool_router: Self::tool_router() }
    }

    /// Route a request through the gatekeeper.
    #[tool(
        description = "Route a page request through the offline cache gatekeeper. Returns the response and \
                       whether it came from the network, the cache, or passed through."
    )]
    async fn gate_fetch(&self, params: Parameters<GateFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(self.gate.as_ref(), params.0).await
    }

    #[tool(description = "Pre-populate the current cache generation from the asset manifest, then activate.")]
    async fn gate_install(&self, params: Parameters<GateInstallParams>) -> Result<CallToolResult, McpError> {
        install_impl(self.gate.as_ref(), params.0).await
    }

    #[tool(description = "Activate the installed gatekeeper and delete every stale cache generation.")]
    async fn gate_activate(&self, params: Parameters<GateActivateParams>) -> Result<CallToolResult, McpError> {
        activate_impl(self.gate.as_ref(), params.0).await
    }

    #[tool(description = "Report lifecycle state, current cache generation and all stored generations.")]
    async fn gate_status(&self, params: Parameters<GateStatusParams>) -> Result<CallToolResult, McpError> {
        status_impl(self.gate.as_ref(), params.0).await
    }

    #[tool(description = "List the URLs stored in a cache generation (default: the current one).")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(self.gate.as_ref(), params.0).await
    }

    #[tool(description = "Delete a cache generation and all of its entries, or one entry when a url is given.")]
    async fn cache_delete(&self, params: Parameters<CacheDeleteParams>) -> Result<CallToolResult, McpError> {
        delete_impl(self.gate.as_ref(), params.0).await
    }
}

impl ServerHandler for GateServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "ghoststock-gate".into(),
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
