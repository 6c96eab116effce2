//! Caching strategies.
//!
//! Every strategy runs against the current cache version and resolves to a
//! [`Resolution`]. Network failures and cache errors are logged and degrade
//! to the cache-or-miss path; nothing here returns an error.
//!
//! | strategy                        | cache read       | network          | cache write            |
//! |---------------------------------|------------------|------------------|------------------------|
//! | `NetworkFirstNoStore`           | only on failure  | first            | never                  |
//! | `CacheFirstPopulate`            | first            | on miss          | after miss fetch       |
//! | `NetworkFirstCachePut`          | only on failure  | first            | every 2xx              |
//! | `CacheFirstWithNetworkFallback` | first            | on miss          | after miss fetch       |
//! | `StaleWhileRevalidate`          | concurrently     | concurrently     | in the background      |

pub mod table;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::oneshot;
use waystation_core::{CacheStore, CacheVersion, CapturedResponse, Request};

use crate::fetch::Network;

pub use table::{StrategyTable, strategy_for};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    NetworkFirstNoStore,
    CacheFirstPopulate,
    NetworkFirstCachePut,
    CacheFirstWithNetworkFallback,
    StaleWhileRevalidate,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkFirstNoStore => "network_first_no_store",
            Self::CacheFirstPopulate => "cache_first_populate",
            Self::NetworkFirstCachePut => "network_first_cache_put",
            Self::CacheFirstWithNetworkFallback => "cache_first_with_network_fallback",
            Self::StaleWhileRevalidate => "stale_while_revalidate",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of running a strategy. `Miss` is terminal, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Network(CapturedResponse),
    Cache(CapturedResponse),
    Miss,
}

impl Resolution {
    pub fn response(&self) -> Option<&CapturedResponse> {
        match self {
            Self::Network(response) | Self::Cache(response) => Some(response),
            Self::Miss => None,
        }
    }

    pub fn into_response(self) -> Option<CapturedResponse> {
        match self {
            Self::Network(response) | Self::Cache(response) => Some(response),
            Self::Miss => None,
        }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss)
    }

    fn from_cache(cached: Option<CapturedResponse>) -> Self {
        cached.map_or(Self::Miss, Self::Cache)
    }
}

/// Executes strategies against one cache version.
#[derive(Clone)]
pub struct StrategyRunner {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    version: CacheVersion,
}

impl StrategyRunner {
    pub fn new(store: Arc<dyn CacheStore>, network: Arc<dyn Network>, version: CacheVersion) -> Self {
        Self { store, network, version }
    }

    pub fn version(&self) -> &CacheVersion {
        &self.version
    }

    /// Same store and network, reading and writing another version.
    pub fn for_version(&self, version: CacheVersion) -> Self {
        Self { store: self.store.clone(), network: self.network.clone(), version }
    }

    pub async fn run(&self, strategy: Strategy, request: &Request) -> Resolution {
        match strategy {
            Strategy::NetworkFirstNoStore => self.network_first(request, false).await,
            Strategy::NetworkFirstCachePut => self.network_first(request, true).await,
            Strategy::CacheFirstPopulate => self.cache_first(request, false).await,
            Strategy::CacheFirstWithNetworkFallback => self.cache_first(request, true).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        }
    }

    async fn network_first(&self, request: &Request, keep_copy: bool) -> Resolution {
        match self.network.fetch(request).await {
            Ok(response) => {
                if keep_copy {
                    self.store_copy(request, &response).await;
                }
                Resolution::Network(response)
            }
            Err(e) => {
                tracing::debug!(url = %request.url(), error = %e, "network failed, falling back to cache");
                Resolution::from_cache(self.cached(request).await)
            }
        }
    }

    /// `recheck` reads the cache once more after a failed miss fetch, so an
    /// entry written concurrently still gets served.
    async fn cache_first(&self, request: &Request, recheck: bool) -> Resolution {
        if let Some(hit) = self.cached(request).await {
            return Resolution::Cache(hit);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                self.store_copy(request, &response).await;
                Resolution::Network(response)
            }
            Err(e) => {
                tracing::debug!(url = %request.url(), error = %e, "network failed on cache miss");
                if recheck { Resolution::from_cache(self.cached(request).await) } else { Resolution::Miss }
            }
        }
    }

    async fn stale_while_revalidate(&self, request: &Request) -> Resolution {
        let fresh = self.spawn_refresh(request.clone());

        if let Some(stale) = self.cached(request).await {
            return Resolution::Cache(stale);
        }

        match fresh.await {
            Ok(Some(response)) => Resolution::Network(response),
            Ok(None) | Err(_) => Resolution::Miss,
        }
    }

    /// Fetch in a detached task. The response is handed back as soon as it
    /// arrives; the cache write happens afterwards in the same task.
    fn spawn_refresh(&self, request: Request) -> oneshot::Receiver<Option<CapturedResponse>> {
        let (tx, rx) = oneshot::channel();
        let runner = self.clone();

        tokio::spawn(async move {
            match runner.network.fetch(&request).await {
                Ok(response) => {
                    let _ = tx.send(Some(response.clone()));
                    runner.store_copy(&request, &response).await;
                }
                Err(e) => {
                    tracing::debug!(url = %request.url(), error = %e, "background refresh failed");
                    let _ = tx.send(None);
                }
            }
        });

        rx
    }

    async fn cached(&self, request: &Request) -> Option<CapturedResponse> {
        match self.store.get(&self.version, &request.descriptor).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(version = %self.version, url = %request.url(), error = %e, "cache read failed");
                None
            }
        }
    }

    /// Best-effort write. Error statuses are never stored.
    async fn store_copy(&self, request: &Request, response: &CapturedResponse) {
        if !response.is_ok() {
            tracing::debug!(url = %request.url(), status = response.status, "not caching error status");
            return;
        }

        if let Err(e) = self.store.put(&self.version, &request.descriptor, response).await {
            tracing::warn!(version = %self.version, url = %request.url(), error = %e, "cache write failed");
        }
    }
}
