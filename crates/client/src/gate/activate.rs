//! Activation step: drop every generation but the current one.

use futures_util::future::join_all;
use ghoststock_core::{CacheStorage, Error};
use serde::Serialize;

/// Outcome of activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub cache_name: String,
    pub deleted: Vec<String>,
    /// Stale generations that could not be deleted.
    pub failed: Vec<String>,
    /// Whether open pages are now controlled.
    pub claimed: bool,
}

/// Delete every generation whose name differs from `keep`.
///
/// Returns the deleted and the failed names. Only enumeration failure is an
/// error; individual deletions are attempted concurrently and reported.
pub async fn prune_generations(storage: &CacheStorage, keep: &str) -> Result<(Vec<String>, Vec<String>), Error> {
    let stale: Vec<String> = storage.keys().await?.into_iter().filter(|name| name != keep).collect();

    let results = join_all(stale.iter().map(|name| storage.delete(name))).await;

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    for (name, result) in stale.into_iter().zip(results) {
        match result {
            Ok(_) => deleted.push(name),
            Err(e) => {
                tracing::warn!(cache_name = %name, error = %e, "failed to delete stale cache generation");
                failed.push(name);
            }
        }
    }

    Ok((deleted, failed))
}
