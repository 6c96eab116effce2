//! Cache schema upgrades.
//!
//! The schema version lives in SQLite's `user_version` header field. Step
//! `n` of [`SCHEMA`] moves the database from version `n` to `n + 1`, inside
//! one transaction together with the header bump.

use super::Error;
use tokio_rusqlite::{Connection, rusqlite};

const SCHEMA: &[&str] = &[include_str!("../../migrations/001_cache_store.sql")];

/// Schema version this build writes.
pub const SCHEMA_VERSION: i64 = SCHEMA.len() as i64;

/// Bring the cache schema up to [`SCHEMA_VERSION`].
///
/// A database written by a newer build is refused rather than downgraded.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let found = schema_version(conn)?;
        if found > SCHEMA_VERSION {
            return Err(Error::MigrationFailed(format!(
                "cache schema {found} is newer than supported {SCHEMA_VERSION}"
            )));
        }

        for (step, sql) in (found..).zip(SCHEMA.iter().skip(found as usize)) {
            let tx = conn.transaction()?;
            tx.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("schema step {}: {e}", step + 1)))?;
            tx.pragma_update(None, "user_version", step + 1)?;
            tx.commit()?;
            tracing::debug!(schema = step + 1, "upgraded cache schema");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

fn schema_version(conn: &rusqlite::Connection) -> Result<i64, Error> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}
