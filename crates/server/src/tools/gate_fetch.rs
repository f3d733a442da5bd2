//! gate_fetch tool implementation.
//!
//! Routes one request through the gatekeeper exactly as an intercepted page
//! request would be, and reports where the response came from.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ghoststock_client::Gatekeeper;
use ghoststock_client::fetch::resolve;
use ghoststock_core::{Error, InterceptedRequest, Network, RequestMode, ResponseSource};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tools::json_result;

/// Input parameters for gate_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GateFetchParams {
    /// URL or origin-relative path (e.g. "/static/js/main.js").
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Accept header sent by the page.
    #[serde(default)]
    pub accept: Option<String>,

    /// Request mode: "navigate", "same-origin", "no-cors" (default) or "cors".
    #[serde(default)]
    pub mode: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for gate_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GateFetchOutput {
    pub url: String,
    /// "network", "cache" or "passthrough".
    pub source: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body as text when it is valid UTF-8.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Body as base64 otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_base64: Option<String>,
    pub bytes: usize,
}

/// Implementation of the gate_fetch tool.
pub async fn fetch_impl<N: Network>(
    gate: &Gatekeeper<N>, params: GateFetchParams,
) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }

    let url = resolve(gate.scope().origin(), &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let mut request = InterceptedRequest::get(url).with_method(&params.method);
    if let Some(accept) = params.accept {
        request = request.with_accept(accept);
    }
    if let Some(mode) = params.mode.as_deref() {
        request = request.with_mode(mode.parse::<RequestMode>()?);
    }

    let (response, intercepted) = gate.respond(&request).await?;
    let source = match (intercepted, response.source) {
        (false, _) => "passthrough",
        (true, ResponseSource::Network) => "network",
        (true, ResponseSource::Cache) => "cache",
    };

    let url = response.url.to_string();
    let status = response.status;
    let content_type = response.content_type().map(str::to_string);
    let headers = response.headers.clone();
    let bytes = response.body.bytes().await?;

    let (body, body_base64) = match std::str::from_utf8(&bytes) {
        Ok(text) => (Some(text.to_string()), None),
        Err(_) => (None, Some(STANDARD.encode(&bytes))),
    };

    json_result(&GateFetchOutput {
        url,
        source: source.to_string(),
        status,
        content_type,
        headers,
        body,
        body_base64,
        bytes: bytes.len(),
    })
}
