//! Per-request routing policy.

use ghoststock_core::InterceptedRequest;
use url::Url;

/// What the gatekeeper does with one intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Leave the request to normal network handling.
    Passthrough,
    /// Network, then any cached copy on failure.
    NetworkFirst,
    /// Cached copy, then network with cache population on a miss.
    CacheFirst,
}

/// The pages a gatekeeper controls: one origin and a path prefix.
///
/// Only navigations are checked against the scope. Subresource requests come
/// from pages already under control, so they are routed whatever their origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    origin: Url,
    path: String,
}

impl Scope {
    pub fn new(origin: Url, path: impl Into<String>) -> Self {
        Self { origin, path: path.into() }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Whether a page at `url` falls under this scope. The path prefix is
    /// matched on whole segments.
    pub fn contains(&self, url: &Url) -> bool {
        if url.origin() != self.origin.origin() {
            return false;
        }
        let prefix = self.path.trim_end_matches('/');
        match url.path().strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Decide the route for a request.
///
/// Non-GET requests always pass through. A navigation to a page outside the
/// scope is not a controlled page and passes through as well.
pub fn classify(request: &InterceptedRequest, scope: &Scope) -> Route {
    if !request.is_get() {
        return Route::Passthrough;
    }
    if request.is_navigational() {
        if scope.contains(&request.url) { Route::NetworkFirst } else { Route::Passthrough }
    } else {
        Route::CacheFirst
    }
}
