//! The versioned cache-store abstraction.
//!
//! Strategies and the lifecycle controller only ever see a
//! `dyn CacheStore`. [`CacheDb`](super::CacheDb) is the persistent
//! implementation and [`MemoryStore`](super::MemoryStore) the in-memory one.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::connection::CacheDb;
use crate::Error;
use crate::request::RequestDescriptor;
use crate::response::CapturedResponse;

/// Name of one on-device cache store, tied to a build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheVersion(String);

impl CacheVersion {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheVersion {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Versioned key-value store mapping request descriptors to captured
/// responses.
///
/// A miss is `Ok(None)`, never an error. `put` is atomic and overwrites any
/// existing entry; writing into a version that was never opened creates it.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the named version if it does not exist yet.
    async fn open(&self, version: &CacheVersion) -> Result<(), Error>;

    async fn get(&self, version: &CacheVersion, key: &RequestDescriptor) -> Result<Option<CapturedResponse>, Error>;

    async fn put(
        &self, version: &CacheVersion, key: &RequestDescriptor, response: &CapturedResponse,
    ) -> Result<(), Error>;

    /// Returns whether an entry was removed.
    async fn delete(&self, version: &CacheVersion, key: &RequestDescriptor) -> Result<bool, Error>;

    /// Descriptors stored in a version, oldest first.
    async fn keys(&self, version: &CacheVersion) -> Result<Vec<RequestDescriptor>, Error>;

    /// Every version present on the device.
    async fn versions(&self) -> Result<Vec<CacheVersion>, Error>;

    /// Drop a version and all of its entries. Returns whether it existed.
    async fn delete_version(&self, version: &CacheVersion) -> Result<bool, Error>;

    /// The version that last activated and still controls clients.
    ///
    /// Survives restarts for persistent stores; dropping that version
    /// clears it.
    async fn active(&self) -> Result<Option<CacheVersion>, Error>;

    /// Record `version` as active, creating it if needed.
    async fn set_active(&self, version: &CacheVersion) -> Result<(), Error>;
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, version: &CacheVersion) -> Result<(), Error> {
        self.open_version(version).await
    }

    async fn get(&self, version: &CacheVersion, key: &RequestDescriptor) -> Result<Option<CapturedResponse>, Error> {
        self.get_entry(version, key).await
    }

    async fn put(
        &self, version: &CacheVersion, key: &RequestDescriptor, response: &CapturedResponse,
    ) -> Result<(), Error> {
        self.put_entry(version, key, response).await
    }

    async fn delete(&self, version: &CacheVersion, key: &RequestDescriptor) -> Result<bool, Error> {
        self.delete_entry(version, key).await
    }

    async fn keys(&self, version: &CacheVersion) -> Result<Vec<RequestDescriptor>, Error> {
        self.list_keys(version).await
    }

    async fn versions(&self) -> Result<Vec<CacheVersion>, Error> {
        self.list_versions().await
    }

    async fn delete_version(&self, version: &CacheVersion) -> Result<bool, Error> {
        self.drop_version(version).await
    }

    async fn active(&self) -> Result<Option<CacheVersion>, Error> {
        self.active_version().await
    }

    async fn set_active(&self, version: &CacheVersion) -> Result<(), Error> {
        self.mark_active(version).await
    }
}
