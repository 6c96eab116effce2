//! waystation server entry point.
//!
//! Loads configuration, opens the cache database, registers the current
//! cache version and boots the MCP server on stdio transport. The lifecycle
//! controller and interceptor share one client registry, so requests keep
//! using a previously active version until `SKIP_WAITING`.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;
use waystation_client::{ClientRegistry, FetchClient, FetchConfig, Interceptor, LifecycleController};
use waystation_core::{AppConfig, CacheDb, CacheStore, CacheVersion, RouteClassifier, StaticManifest};

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let origin = config.origin_url()?;
    let version = CacheVersion::new(config.cache_version.clone());

    tracing::info!(
        origin = %origin,
        version = %version,
        db_path = %config.db_path.display(),
        "Starting waystation server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let store: Arc<dyn CacheStore> = Arc::new(db.clone());
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);

    let classifier = RouteClassifier::new(origin.clone(), config.routes.clone());
    let manifest = StaticManifest::new(origin, config.static_manifest.clone());

    let clients = Arc::new(ClientRegistry::new());
    let mut lifecycle = LifecycleController::new(version.clone(), manifest, store.clone(), network.clone())
        .with_clients(clients.clone());
    match classifier.directory_url() {
        Ok(seed) => lifecycle = lifecycle.with_directory_seed(seed),
        Err(e) => tracing::warn!(error = %e, "directory query is not a valid URL, skipping seed"),
    }

    let report = lifecycle.register().await?;
    tracing::info!(
        cached = report.cached.len(),
        failed = report.failed.len(),
        seeded = report.seeded,
        activated = report.activation.is_some(),
        state = %lifecycle.state(),
        "registered cache version"
    );

    let interceptor = Interceptor::new(classifier, store, network, version).with_clients(clients);
    let handler = handler::WaystationServer::new(Arc::new(interceptor), Arc::new(lifecycle), db);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
