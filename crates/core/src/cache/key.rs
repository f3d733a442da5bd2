//! Request keys for cache entries.

use sha2::{Digest, Sha256};
use url::Url;

/// Compute the storage key for a request URL.
///
/// The fragment never reaches the server, so it never distinguishes entries.
/// Query strings do.
pub fn request_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    compute_request_key(url.as_str())
}

/// Hash an already-normalized URL string.
pub fn compute_request_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"GET\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
