//! Versioned on-device cache store.
//!
//! This module provides the [`CacheStore`] abstraction and its two
//! implementations:
//!
//! - [`CacheDb`]: SQLite with async access via tokio-rusqlite, WAL mode,
//!   automatic schema migrations and cascading version deletes
//! - [`MemoryStore`]: volatile maps, same contract
//!
//! Entries are keyed per version by a SHA-256 digest of the request
//! descriptor.

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod store;
pub mod versions;

pub use crate::Error;

pub use connection::CacheDb;
pub use memory::MemoryStore;
pub use store::{CacheStore, CacheVersion};
pub use versions::VersionStats;

/// Timestamp written to `created_at` and `stored_at`.
///
/// Both columns are ordered as text, so every writer must use this one
/// fixed-width UTC format.
pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
