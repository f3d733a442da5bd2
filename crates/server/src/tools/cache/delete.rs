//! cache_delete tool implementation.
//!
//! Deletes one cache generation with all of its entries, or a single entry
//! from it when a URL is given.

use ghoststock_client::Gatekeeper;
use ghoststock_client::fetch::resolve;
use ghoststock_core::{Error, InterceptedRequest, Network};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteParams {
    /// Name of the generation.
    pub cache_name: String,

    /// Delete only the entry stored for this URL or origin-relative path.
    #[serde(default)]
    pub url: Option<String>,
}

/// Output from the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteOutput {
    /// False if nothing matched.
    pub deleted: bool,
}

/// Implementation of the cache_delete tool.
pub async fn delete_impl<N: Network>(
    gate: &Gatekeeper<N>, params: CacheDeleteParams,
) -> Result<CallToolResult, McpError> {
    if params.cache_name.trim().is_empty() {
        return Err(ToolError::InvalidInput("cache_name cannot be empty".into()).into());
    }

    let storage = gate.storage();
    let deleted = match params.url.as_deref() {
        None => {
            let deleted = storage.delete(&params.cache_name).await?;
            if deleted {
                tracing::info!(cache_name = %params.cache_name, "deleted cache generation");
            }
            deleted
        }
        Some(url) => {
            let url = resolve(gate.scope().origin(), url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
            let request = InterceptedRequest::get(url);
            let deleted = storage.has(&params.cache_name).await?
                && storage.open_cache(&params.cache_name).await?.delete_entry(&request).await?;
            if deleted {
                tracing::info!(cache_name = %params.cache_name, url = %request.url, "deleted cache entry");
            }
            deleted
        }
    };

    json_result(&CacheDeleteOutput { deleted })
}
