//! Cache version operations.
//!
//! A version row owns its entries through `ON DELETE CASCADE`, so dropping a
//! version is a single statement.

use super::connection::CacheDb;
use super::now;
use super::store::CacheVersion;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// A version present on the device and the number of entries it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionStats {
    pub version: CacheVersion,
    pub created_at: String,
    pub entries: u64,
    /// Whether this version currently controls clients.
    pub active: bool,
}

impl CacheDb {
    /// Create a version if it does not exist. Idempotent.
    pub async fn open_version(&self, version: &CacheVersion) -> Result<(), Error> {
        let name = version.as_str().to_string();
        let created_at = now();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_versions (name, created_at) VALUES (?1, ?2)
                    ON CONFLICT(name) DO NOTHING",
                    params![name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// List every version, oldest first.
    pub async fn list_versions(&self) -> Result<Vec<CacheVersion>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<CacheVersion>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_versions ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names.into_iter().map(CacheVersion::new).collect())
            })
            .await
            .map_err(Error::from)
    }

    /// Per-version entry counts, oldest version first.
    pub async fn version_stats(&self) -> Result<Vec<VersionStats>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<VersionStats>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT v.name, v.created_at, COUNT(e.key_hash), v.active
                    FROM cache_versions v
                    LEFT JOIN cache_entries e ON e.version = v.name
                    GROUP BY v.name, v.created_at, v.active
                    ORDER BY v.created_at ASC, v.name ASC",
                )?;
                let stats = stmt
                    .query_map([], |row| {
                        Ok(VersionStats {
                            version: CacheVersion::new(row.get::<_, String>(0)?),
                            created_at: row.get(1)?,
                            entries: row.get::<_, i64>(2)? as u64,
                            active: row.get(3)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(stats)
            })
            .await
            .map_err(Error::from)
    }

    /// The version recorded as controlling clients, if any.
    pub async fn active_version(&self) -> Result<Option<CacheVersion>, Error> {
        self.conn
            .call(|conn| -> Result<Option<CacheVersion>, Error> {
                match conn.query_row("SELECT name FROM cache_versions WHERE active = 1", [], |row| {
                    row.get::<_, String>(0)
                }) {
                    Ok(name) => Ok(Some(CacheVersion::new(name))),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Record `version` as the one controlling clients, creating it if needed.
    ///
    /// Clears the flag on every other version in the same transaction.
    pub async fn mark_active(&self, version: &CacheVersion) -> Result<(), Error> {
        let name = version.as_str().to_string();
        let created_at = now();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO cache_versions (name, created_at) VALUES (?1, ?2)
                    ON CONFLICT(name) DO NOTHING",
                    params![&name, &created_at],
                )?;
                tx.execute("UPDATE cache_versions SET active = 0 WHERE active = 1 AND name <> ?1", params![&name])?;
                tx.execute("UPDATE cache_versions SET active = 1 WHERE name = ?1", params![&name])?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a version together with all of its entries.
    ///
    /// Returns whether the version existed.
    pub async fn drop_version(&self, version: &CacheVersion) -> Result<bool, Error> {
        let name = version.as_str().to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM cache_versions WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}
