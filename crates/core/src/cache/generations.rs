//! Named cache generations.
//!
//! A generation is the unit of invalidation: entries are never expired one by
//! one, the whole generation is dropped once its tag stops being current.

use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

use super::connection::CacheStorage;
use crate::Error;

/// Handle to one opened generation.
#[derive(Clone, Debug)]
pub struct GenerationCache {
    pub(crate) storage: CacheStorage,
    pub(crate) id: i64,
    pub(crate) name: String,
}

impl GenerationCache {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Summary of a stored generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GenerationInfo {
    pub name: String,
    pub created_at: String,
    pub entries: u64,
}

impl CacheStorage {
    /// Open the named generation, creating it if absent.
    pub async fn open_cache(&self, name: &str) -> Result<GenerationCache, Error> {
        let owned = name.to_string();
        let id = self
            .conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
                    params![&owned, chrono::Utc::now().to_rfc3339()],
                )?;
                let id = conn.query_row("SELECT id FROM caches WHERE name = ?1", params![&owned], |row| row.get(0))?;
                Ok(id)
            })
            .await
            .map_err(Error::from)?;

        Ok(GenerationCache { storage: self.clone(), id, name: name.to_string() })
    }

    /// Names of every stored generation, oldest first.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY id ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, rusqlite::Error>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Whether a generation with this name exists.
    pub async fn has(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let id: Option<i64> = conn
                    .query_row("SELECT id FROM caches WHERE name = ?1", params![name], |row| row.get(0))
                    .optional()?;
                Ok(id.is_some())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and all of its entries.
    ///
    /// Returns false if no generation had that name.
    pub async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Every generation with its entry count, oldest first.
    pub async fn generations(&self) -> Result<Vec<GenerationInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<GenerationInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT c.name, c.created_at, COUNT(e.request_key)
                     FROM caches c LEFT JOIN cache_entries e ON e.cache_id = c.id
                     GROUP BY c.id
                     ORDER BY c.id ASC",
                )?;
                let infos = stmt
                    .query_map([], |row| {
                        Ok(GenerationInfo {
                            name: row.get(0)?,
                            created_at: row.get(1)?,
                            entries: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(infos)
            })
            .await
            .map_err(Error::from)
    }
}
