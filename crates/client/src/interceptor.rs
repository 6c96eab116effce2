//! Entry point for every outgoing request.
//!
//! Non-GET requests and immutable build assets pass straight through; all
//! other reads are classified and handed to their strategy.
//!
//! Strategies run against the version currently controlling clients. A
//! newer version that is still waiting is never read from or written to.

use std::sync::Arc;

use serde::Serialize;
use waystation_core::{CacheStore, CacheVersion, CapturedResponse, Error, Request, RouteClass, RouteClassifier};

use crate::fetch::Network;
use crate::lifecycle::ClientRegistry;
use crate::strategy::{Resolution, Strategy, StrategyRunner, StrategyTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassthroughReason {
    NonGet,
    ImmutableAsset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// The layer declined the request; it goes to the network untouched.
    Passthrough(PassthroughReason),
    Handled { class: RouteClass, strategy: Strategy, version: CacheVersion, resolution: Resolution },
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Network,
    Cache,
    Passthrough,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Cache => "cache",
            Self::Passthrough => "passthrough",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Served {
    pub response: CapturedResponse,
    pub source: Source,
    pub class: RouteClass,
    pub strategy: Option<Strategy>,
    /// Version the strategy ran against; `None` for passthrough.
    pub version: Option<CacheVersion>,
}

pub struct Interceptor {
    classifier: RouteClassifier,
    table: StrategyTable,
    runner: StrategyRunner,
    network: Arc<dyn Network>,
    clients: Option<Arc<ClientRegistry>>,
}

impl Interceptor {
    pub fn new(
        classifier: RouteClassifier, store: Arc<dyn CacheStore>, network: Arc<dyn Network>, version: CacheVersion,
    ) -> Self {
        let runner = StrategyRunner::new(store, network.clone(), version);
        Self { classifier, table: StrategyTable::default(), runner, network, clients: None }
    }

    /// Serve from whichever version controls these clients instead of
    /// always using the build's own version.
    pub fn with_clients(mut self, clients: Arc<ClientRegistry>) -> Self {
        self.clients = Some(clients);
        self
    }

    pub fn with_table(mut self, table: StrategyTable) -> Self {
        self.table = table;
        self
    }

    pub fn classifier(&self) -> &RouteClassifier {
        &self.classifier
    }

    pub fn version(&self) -> &CacheVersion {
        self.runner.version()
    }

    /// The version strategies read and write right now.
    ///
    /// Falls back to the build's version before anything has activated.
    pub fn serving_version(&self) -> CacheVersion {
        self.clients
            .as_ref()
            .and_then(|clients| clients.active())
            .unwrap_or_else(|| self.runner.version().clone())
    }

    /// Decide what to do with a request without touching the cache or network.
    pub fn route(&self, request: &Request) -> Result<(RouteClass, Strategy), PassthroughReason> {
        if !request.descriptor.is_get() {
            return Err(PassthroughReason::NonGet);
        }
        let class = self.classifier.classify(request);
        self.table.lookup(class).map(|strategy| (class, strategy)).ok_or(PassthroughReason::ImmutableAsset)
    }

    pub async fn intercept(&self, request: &Request) -> Interception {
        match self.route(request) {
            Err(reason) => {
                tracing::trace!(url = %request.url(), method = request.method(), ?reason, "passthrough");
                Interception::Passthrough(reason)
            }
            Ok((class, strategy)) => {
                let version = self.serving_version();
                let resolution = if version == *self.runner.version() {
                    self.runner.run(strategy, request).await
                } else {
                    self.runner.for_version(version.clone()).run(strategy, request).await
                };
                tracing::debug!(
                    url = %request.url(),
                    class = %class,
                    strategy = %strategy,
                    version = %version,
                    miss = resolution.is_miss(),
                    "intercepted"
                );
                Interception::Handled { class, strategy, version, resolution }
            }
        }
    }

    /// Intercept and produce a response, fetching passthrough requests
    /// directly. A strategy miss becomes [`Error::CacheMiss`].
    pub async fn respond(&self, request: &Request) -> Result<Served, Error> {
        match self.intercept(request).await {
            Interception::Passthrough(_) => {
                let response = self.network.fetch(request).await?;
                let class = self.classifier.classify(request);
                Ok(Served { response, source: Source::Passthrough, class, strategy: None, version: None })
            }
            Interception::Handled { class, strategy, version, resolution } => {
                let (response, source) = match resolution {
                    Resolution::Network(response) => (response, Source::Network),
                    Resolution::Cache(response) => (response, Source::Cache),
                    Resolution::Miss => return Err(Error::CacheMiss(request.descriptor.to_string())),
                };
                Ok(Served { response, source, class, strategy: Some(strategy), version: Some(version) })
            }
        }
    }
}
