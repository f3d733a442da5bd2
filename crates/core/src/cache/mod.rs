//! SQLite-backed cache storage organised in named generations.
//!
//! This module provides a persistent, origin-scoped request/response store
//! using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named generations that can be opened, enumerated and deleted as a whole
//! - Per-generation entries keyed by a hash of the request URL
//! - All-or-nothing batch insertion for manifest population
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod generations;
pub mod key;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheStorage;
pub use entries::CachedResponse;
pub use generations::{GenerationCache, GenerationInfo};
