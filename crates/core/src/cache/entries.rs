//! Cache entry CRUD operations.
//!
//! Provides functions for storing, reading, and deleting captured responses
//! inside a cache version.

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use super::now;
use super::store::CacheVersion;
use crate::Error;
use crate::request::RequestDescriptor;
use crate::response::CapturedResponse;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

/// Row payload before header decoding.
type RawEntry = (i64, String, Vec<u8>);

impl CacheDb {
    /// Insert or replace a captured response.
    ///
    /// Creates the version row when missing. Both writes share one
    /// transaction, so readers never observe a partial entry.
    pub async fn put_entry(
        &self, version: &CacheVersion, key: &RequestDescriptor, response: &CapturedResponse,
    ) -> Result<(), Error> {
        let version = version.as_str().to_string();
        let key_hash = compute_cache_key(key);
        let method = key.method().to_string();
        let url = key.url().to_string();
        let status = i64::from(response.status);
        let headers_json = serde_json::to_string(&response.headers)?;
        let body = response.body.to_vec();
        let stored_at = now();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO cache_versions (name, created_at) VALUES (?1, ?2)
                    ON CONFLICT(name) DO NOTHING",
                    params![&version, &stored_at],
                )?;
                tx.execute(
                    "INSERT INTO cache_entries (
                    version, key_hash, method, url, status, headers_json, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(version, key_hash) DO UPDATE SET
                    method = excluded.method,
                    url = excluded.url,
                    status = excluded.status,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![&version, &key_hash, &method, &url, status, &headers_json, &body, &stored_at],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a captured response.
    ///
    /// Returns None on a cache miss.
    pub async fn get_entry(
        &self, version: &CacheVersion, key: &RequestDescriptor,
    ) -> Result<Option<CapturedResponse>, Error> {
        let version = version.as_str().to_string();
        let key_hash = compute_cache_key(key);

        let raw = self
            .conn
            .call(move |conn| -> Result<Option<RawEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, headers_json, body FROM cache_entries
                    WHERE version = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![version, key_hash], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                });

                match result {
                    Ok(raw) => Ok(Some(raw)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((status, headers_json, body)) = raw else {
            return Ok(None);
        };

        let status = u16::try_from(status).map_err(|_| Error::Serialization(format!("invalid status {status}")))?;
        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;

        Ok(Some(CapturedResponse::new(status, headers, body)))
    }

    /// Delete one entry.
    ///
    /// Returns whether a row was removed.
    pub async fn delete_entry(&self, version: &CacheVersion, key: &RequestDescriptor) -> Result<bool, Error> {
        let version = version.as_str().to_string();
        let key_hash = compute_cache_key(key);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE version = ?1 AND key_hash = ?2",
                    params![version, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// List the descriptors stored in a version, least recently written first.
    pub async fn list_keys(&self, version: &CacheVersion) -> Result<Vec<RequestDescriptor>, Error> {
        let version = version.as_str().to_string();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<(String, String)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url FROM cache_entries
                    WHERE version = ?1 ORDER BY stored_at ASC, rowid ASC",
                )?;
                let rows = stmt
                    .query_map(params![version], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter()
            .map(|(method, url)| {
                let url = Url::parse(&url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
                Ok(RequestDescriptor::new(&method, url))
            })
            .collect()
    }
}
