//! The network collaborator the gatekeeper falls back to or prefers.

use async_trait::async_trait;

use crate::{Error, GateResponse, InterceptedRequest};

/// Performs a live request on behalf of the page.
///
/// Implementations return `Ok` for any HTTP status the server produced and
/// `Err` only when no response could be obtained at all (offline, DNS failure,
/// refused connection, timeout).
#[async_trait]
pub trait Network: Send + Sync + 'static {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<GateResponse, Error>;
}
