//! MCP tool implementations.
//!
//! This module contains all tools exposed by the gatekeeper server.
#![allow(unused_imports)]

pub mod cache;
pub mod gate_fetch;
pub mod lifecycle;

#[cfg(test)]
pub(crate) mod testing;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

pub use gate_fetch::{GateFetchOutput, GateFetchParams};
pub use lifecycle::{GateActivateParams, GateInstallParams, GateStatusOutput, GateStatusParams};

/// Wrap a serializable output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::Output(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
