//! Core types and shared functionality for the ghoststock gatekeeper.
//!
//! This crate provides:
//! - Generation-scoped cache storage with SQLite backend
//! - Intercepted request and response types
//! - The network seam used by the gatekeeper
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod network;

pub use cache::{CacheStorage, CachedResponse, GenerationCache};
pub use config::{CACHE_NAME, ConfigError, GateConfig, PRECACHE_ASSETS};
pub use error::Error;
pub use http::{Body, GateResponse, InterceptedRequest, RequestMode, ResponseSource};
pub use network::Network;
