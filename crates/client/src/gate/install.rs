//! Install step: populate the current generation from the asset manifest.

use futures_util::future::try_join_all;
use ghoststock_core::{CacheStorage, CachedResponse, Error, InterceptedRequest, Network};
use serde::Serialize;

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub cache_name: String,
    /// URLs committed to the generation, in manifest order.
    pub stored: Vec<String>,
}

/// Fetch every manifest entry and commit them to `cache_name` together.
///
/// Any transport failure, non-2xx status or storage error fails the whole
/// step and leaves the generation's previous contents untouched.
pub async fn precache<N: Network + ?Sized>(
    storage: &CacheStorage, network: &N, cache_name: &str, manifest: &[InterceptedRequest],
) -> Result<InstallReport, Error> {
    let cache = storage
        .open_cache(cache_name)
        .await
        .map_err(|e| Error::InstallFailed { url: cache_name.to_string(), reason: e.to_string() })?;

    let entries = try_join_all(manifest.iter().map(|request| fetch_asset(network, request))).await?;

    cache
        .put_all(&entries)
        .await
        .map_err(|e| Error::InstallFailed { url: cache_name.to_string(), reason: e.to_string() })?;

    Ok(InstallReport {
        cache_name: cache_name.to_string(),
        stored: manifest.iter().map(|request| request.url.to_string()).collect(),
    })
}

async fn fetch_asset<N: Network + ?Sized>(
    network: &N, request: &InterceptedRequest,
) -> Result<(InterceptedRequest, CachedResponse), Error> {
    let failed = |reason: String| Error::InstallFailed { url: request.url.to_string(), reason };

    let response = network.fetch(request).await.map_err(|e| failed(e.to_string()))?;
    if !response.is_ok() {
        return Err(failed(format!("status {}", response.status)));
    }

    let cached = CachedResponse::from_response(response)
        .await
        .map_err(|e| failed(e.to_string()))?;
    tracing::debug!(url = %request.url, bytes = cached.body.len(), "fetched manifest asset");

    Ok((request.clone(), cached))
}
