//! In-memory cache store.
//!
//! Same contract as the SQLite store, without persistence. Useful for tests
//! and for ephemeral sessions.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::hash::compute_cache_key;
use super::store::{CacheStore, CacheVersion};
use crate::Error;
use crate::request::RequestDescriptor;
use crate::response::CapturedResponse;

#[derive(Debug, Default)]
struct Bucket {
    /// key hash → (write sequence, descriptor, response)
    entries: BTreeMap<String, (u64, RequestDescriptor, CapturedResponse)>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Versions in creation order.
    order: Vec<CacheVersion>,
    buckets: BTreeMap<CacheVersion, Bucket>,
    active: Option<CacheVersion>,
    seq: u64,
}

impl Inner {
    fn bucket_mut(&mut self, version: &CacheVersion) -> &mut Bucket {
        if !self.buckets.contains_key(version) {
            self.order.push(version.clone());
        }
        self.buckets.entry(version.clone()).or_default()
    }
}

/// Volatile [`CacheStore`] backed by ordered maps behind a tokio `RwLock`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, version: &CacheVersion) -> Result<(), Error> {
        self.inner.write().await.bucket_mut(version);
        Ok(())
    }

    async fn get(&self, version: &CacheVersion, key: &RequestDescriptor) -> Result<Option<CapturedResponse>, Error> {
        let inner = self.inner.read().await;
        Ok(inner
            .buckets
            .get(version)
            .and_then(|bucket| bucket.entries.get(&compute_cache_key(key)))
            .map(|(_, _, response)| response.clone()))
    }

    async fn put(
        &self, version: &CacheVersion, key: &RequestDescriptor, response: &CapturedResponse,
    ) -> Result<(), Error> {
        let mut inner = self.inner.write().await;
        inner.seq += 1;
        let seq = inner.seq;
        inner
            .bucket_mut(version)
            .entries
            .insert(compute_cache_key(key), (seq, key.clone(), response.clone()));
        Ok(())
    }

    async fn delete(&self, version: &CacheVersion, key: &RequestDescriptor) -> Result<bool, Error> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .buckets
            .get_mut(version)
            .is_some_and(|bucket| bucket.entries.remove(&compute_cache_key(key)).is_some()))
    }

    async fn keys(&self, version: &CacheVersion) -> Result<Vec<RequestDescriptor>, Error> {
        let inner = self.inner.read().await;
        let Some(bucket) = inner.buckets.get(version) else {
            return Ok(Vec::new());
        };
        let mut entries: Vec<_> = bucket.entries.values().collect();
        entries.sort_by_key(|(seq, _, _)| *seq);
        Ok(entries.into_iter().map(|(_, key, _)| key.clone()).collect())
    }

    async fn versions(&self) -> Result<Vec<CacheVersion>, Error> {
        Ok(self.inner.read().await.order.clone())
    }

    async fn delete_version(&self, version: &CacheVersion) -> Result<bool, Error> {
        let mut inner = self.inner.write().await;
        inner.order.retain(|v| v != version);
        if inner.active.as_ref() == Some(version) {
            inner.active = None;
        }
        Ok(inner.buckets.remove(version).is_some())
    }

    async fn active(&self) -> Result<Option<CacheVersion>, Error> {
        Ok(self.inner.read().await.active.clone())
    }

    async fn set_active(&self, version: &CacheVersion) -> Result<(), Error> {
        let mut inner = self.inner.write().await;
        inner.bucket_mut(version);
        inner.active = Some(version.clone());
        Ok(())
    }
}
