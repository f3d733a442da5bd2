//! cache_keys tool implementation.
//!
//! Lists the URLs stored in one cache generation.

use ghoststock_client::Gatekeeper;
use ghoststock_core::{Error, Network};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Generation to list (default: the current one).
    #[serde(default)]
    pub cache_name: Option<String>,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub cache_name: String,
    pub urls: Vec<String>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl<N: Network>(
    gate: &Gatekeeper<N>, params: CacheKeysParams,
) -> Result<CallToolResult, McpError> {
    let cache_name = params.cache_name.unwrap_or_else(|| gate.cache_name().to_string());

    if !gate.storage().has(&cache_name).await? {
        return Err(Error::CacheMiss(cache_name).into());
    }

    let urls = gate.storage().open_cache(&cache_name).await?.urls().await?;
    json_result(&CacheKeysOutput { cache_name, urls })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{gatekeeper, output, site};

    #[tokio::test]
    async fn test_keys_current_generation() {
        let gate = gatekeeper(site()).await;
        gate.register().await.unwrap();

        let out: CacheKeysOutput = output(&keys_impl(&gate, CacheKeysParams::default()).await.unwrap());
        assert_eq!(out.cache_name, "ghoststock-cache-v4");
        assert_eq!(
            out.urls,
            vec![
                "http://127.0.0.1:5000/static/css/styles.css",
                "http://127.0.0.1:5000/static/img/logo.png",
                "http://127.0.0.1:5000/static/js/main.js",
            ]
        );
    }

    #[tokio::test]
    async fn test_keys_unknown_generation() {
        let gate = gatekeeper(site()).await;
        let params = CacheKeysParams { cache_name: Some("ghoststock-cache-v1".into()) };

        let err = keys_impl(&gate, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
        assert!(!gate.storage().has("ghoststock-cache-v1").await.unwrap());
    }
}
