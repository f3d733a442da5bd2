//! Stored response snapshots within a generation.

use std::collections::BTreeMap;

use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, Row};
use url::Url;

use super::connection::CacheStorage;
use super::generations::GenerationCache;
use super::key::request_key;
use crate::http::{Body, GateResponse, InterceptedRequest, ResponseSource};
use crate::Error;

/// Status code the cache refuses to store.
const PARTIAL_CONTENT: u16 = 206;

/// Marker recorded for `Vary: *`, which never matches.
const VARY_ANY: &str = "*";

/// A response snapshot as held in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub stored_at: String,
}

impl CachedResponse {
    /// Buffer a live response into a storable snapshot.
    pub async fn from_response(response: GateResponse) -> Result<Self, Error> {
        let body = response.body.bytes().await?;
        Ok(Self {
            url: response.url.to_string(),
            status: response.status,
            headers: response.headers,
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Turn the snapshot back into a response for the page.
    pub fn into_response(self) -> Result<GateResponse, Error> {
        let url = Url::parse(&self.url).map_err(|e| Error::CorruptEntry(format!("stored url {}: {e}", self.url)))?;
        Ok(GateResponse::new(url, self.status, self.headers, Body::from_bytes(self.body), ResponseSource::Cache))
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Request header values named by this response's `Vary` header.
    fn vary_snapshot(&self, request: &InterceptedRequest) -> Option<BTreeMap<String, Option<String>>> {
        let vary = self.header("vary")?;
        let mut snapshot = BTreeMap::new();
        for name in vary.split(',').map(|n| n.trim().to_ascii_lowercase()).filter(|n| !n.is_empty()) {
            if name == VARY_ANY {
                snapshot.clear();
                snapshot.insert(VARY_ANY.to_string(), None);
                break;
            }
            let value = request.header(&name).map(str::to_string);
            snapshot.insert(name, value);
        }
        Some(snapshot)
    }
}

/// Whether a stored vary snapshot admits this request.
fn vary_matches(vary_json: Option<&str>, request: &InterceptedRequest) -> Result<bool, Error> {
    let Some(json) = vary_json else {
        return Ok(true);
    };
    let snapshot: BTreeMap<String, Option<String>> = serde_json::from_str(json)?;
    if snapshot.contains_key(VARY_ANY) {
        return Ok(false);
    }
    Ok(snapshot.iter().all(|(name, value)| request.header(name) == value.as_deref()))
}

struct StoredRow {
    vary_json: Option<String>,
    url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl StoredRow {
    const COLUMNS: &'static str = "e.vary_json, e.url, e.status, e.headers_json, e.body, e.stored_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            vary_json: row.get(0)?,
            url: row.get(1)?,
            status: row.get::<_, i64>(2)? as u16,
            headers_json: row.get(3)?,
            body: row.get(4)?,
            stored_at: row.get(5)?,
        })
    }

    fn into_cached(self) -> Result<CachedResponse, Error> {
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)?;
        Ok(CachedResponse {
            url: self.url,
            status: self.status,
            headers,
            body: Bytes::from(self.body),
            stored_at: self.stored_at,
        })
    }
}

struct PreparedEntry {
    key: String,
    url: String,
    vary_json: Option<String>,
    status: i64,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

fn prepare_entry(request: &InterceptedRequest, response: &CachedResponse) -> Result<PreparedEntry, Error> {
    if response.status == PARTIAL_CONTENT {
        return Err(Error::InvalidInput(format!("partial response for {} cannot be cached", request.url)));
    }
    let vary_json = response
        .vary_snapshot(request)
        .map(|snapshot| serde_json::to_string(&snapshot))
        .transpose()?;
    let mut url = request.url.clone();
    url.set_fragment(None);
    Ok(PreparedEntry {
        key: request_key(&request.url),
        url: url.to_string(),
        vary_json,
        status: response.status as i64,
        headers_json: serde_json::to_string(&response.headers)?,
        body: response.body.to_vec(),
        stored_at: response.stored_at.clone(),
    })
}

fn insert_entry(conn: &rusqlite::Connection, cache_id: i64, entry: &PreparedEntry) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO cache_entries (cache_id, request_key, url, vary_json, status, headers_json, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(cache_id, request_key) DO UPDATE SET
            url = excluded.url,
            vary_json = excluded.vary_json,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            cache_id,
            &entry.key,
            &entry.url,
            &entry.vary_json,
            entry.status,
            &entry.headers_json,
            &entry.body,
            &entry.stored_at,
        ],
    )
}

impl GenerationCache {
    /// Look up the entry stored for this request in this generation.
    pub async fn match_request(&self, request: &InterceptedRequest) -> Result<Option<CachedResponse>, Error> {
        let key = request_key(&request.url);
        let cache_id = self.id;
        let row = self
            .storage
            .conn
            .call(move |conn| -> Result<Option<StoredRow>, Error> {
                let sql = format!(
                    "SELECT {} FROM cache_entries e WHERE e.cache_id = ?1 AND e.request_key = ?2",
                    StoredRow::COLUMNS
                );
                let row = conn
                    .query_row(&sql, params![cache_id, key], StoredRow::from_row)
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(Error::from)?;

        match row {
            Some(row) if vary_matches(row.vary_json.as_deref(), request)? => Ok(Some(row.into_cached()?)),
            _ => Ok(None),
        }
    }

    /// Store a response for this request, replacing any previous entry.
    ///
    /// Partial (206) responses are rejected.
    pub async fn put(&self, request: &InterceptedRequest, response: &CachedResponse) -> Result<(), Error> {
        let entry = prepare_entry(request, response)?;
        let cache_id = self.id;
        self.storage
            .conn
            .call(move |conn| -> Result<(), Error> {
                insert_entry(conn, cache_id, &entry)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store a batch of entries in one transaction. Either every entry is
    /// committed or none is.
    pub async fn put_all(&self, entries: &[(InterceptedRequest, CachedResponse)]) -> Result<(), Error> {
        let prepared = entries
            .iter()
            .map(|(request, response)| prepare_entry(request, response))
            .collect::<Result<Vec<_>, Error>>()?;
        let cache_id = self.id;
        self.storage
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for entry in &prepared {
                    insert_entry(&tx, cache_id, entry)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the entry for this request. Returns false if none was stored.
    pub async fn delete_entry(&self, request: &InterceptedRequest) -> Result<bool, Error> {
        let key = request_key(&request.url);
        let cache_id = self.id;
        self.storage
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM cache_entries WHERE cache_id = ?1 AND request_key = ?2",
                    params![cache_id, key],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// URLs stored in this generation, sorted.
    pub async fn urls(&self) -> Result<Vec<String>, Error> {
        let cache_id = self.id;
        self.storage
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM cache_entries WHERE cache_id = ?1 ORDER BY url ASC")?;
                let urls = stmt
                    .query_map(params![cache_id], |row| row.get(0))?
                    .collect::<Result<Vec<String>, rusqlite::Error>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn len(&self) -> Result<u64, Error> {
        let cache_id = self.id;
        self.storage
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE cache_id = ?1",
                    params![cache_id],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}

impl CacheStorage {
    /// Look up this request across every generation, oldest first, and
    /// return the first entry that matches.
    pub async fn match_request(&self, request: &InterceptedRequest) -> Result<Option<CachedResponse>, Error> {
        let key = request_key(&request.url);
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<StoredRow>, Error> {
                let sql = format!(
                    "SELECT {} FROM cache_entries e JOIN caches c ON c.id = e.cache_id
                     WHERE e.request_key = ?1 ORDER BY c.id ASC",
                    StoredRow::COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![key], StoredRow::from_row)?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        for row in rows {
            if vary_matches(row.vary_json.as_deref(), request)? {
                return Ok(Some(row.into_cached()?));
            }
        }
        Ok(None)
    }
}
