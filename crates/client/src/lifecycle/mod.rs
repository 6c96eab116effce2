//! Version lifecycle: install, activate and the update signal.
//!
//! ```text
//! Idle → Installing → Waiting → Activating → Activated
//! ```
//!
//! Install populates the current version and stops in `Waiting`. Activation
//! records the version as active in the store, garbage-collects every other
//! version and claims open clients. It happens either from
//! [`LifecycleController::register`] when no older version is still active,
//! or when a `SKIP_WAITING` message arrives.

pub mod clients;
pub mod message;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;
use url::Url;
use waystation_core::{CacheStore, CacheVersion, Error, Request, StaticManifest};

use crate::fetch::Network;

pub use clients::{ClientId, ClientRegistry};
pub use message::{ClientMessage, MessageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Idle,
    Installing,
    Waiting,
    Activating,
    Activated,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Installing => "installing",
            Self::Waiting => "waiting",
            Self::Activating => "activating",
            Self::Activated => "activated",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub version: CacheVersion,
    /// Manifest entries now in the cache.
    pub cached: Vec<String>,
    /// Manifest entries that could not be fetched or stored.
    pub failed: Vec<String>,
    /// Whether the directory-query seed was stored.
    pub seeded: bool,
    /// Set when install finished straight into activation.
    pub activation: Option<ActivateReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub deleted: Vec<CacheVersion>,
    pub claimed: usize,
}

/// Current state plus a `SKIP_WAITING` that arrived before install finished.
///
/// Both live under one lock so every transition is a single compare-and-set.
#[derive(Debug)]
struct Phase {
    state: LifecycleState,
    skip_requested: bool,
}

pub struct LifecycleController {
    version: CacheVersion,
    manifest: StaticManifest,
    directory_seed: Option<Url>,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    clients: Arc<ClientRegistry>,
    phase: Mutex<Phase>,
}

impl LifecycleController {
    pub fn new(
        version: CacheVersion, manifest: StaticManifest, store: Arc<dyn CacheStore>, network: Arc<dyn Network>,
    ) -> Self {
        Self {
            version,
            manifest,
            directory_seed: None,
            store,
            network,
            clients: Arc::new(ClientRegistry::new()),
            phase: Mutex::new(Phase { state: LifecycleState::Idle, skip_requested: false }),
        }
    }

    /// Best-effort pre-population of the directory query during install.
    pub fn with_directory_seed(mut self, url: Url) -> Self {
        self.directory_seed = Some(url);
        self
    }

    pub fn with_clients(mut self, clients: Arc<ClientRegistry>) -> Self {
        self.clients = clients;
        self
    }

    pub fn version(&self) -> &CacheVersion {
        &self.version
    }

    pub fn clients(&self) -> &Arc<ClientRegistry> {
        &self.clients
    }

    pub fn state(&self) -> LifecycleState {
        self.phase().state
    }

    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: LifecycleState) {
        self.phase().state = state;
        tracing::debug!(version = %self.version, state = %state, "lifecycle state");
    }

    /// Move `Waiting` to `Activating`. Exactly one concurrent caller wins.
    fn claim_activation(&self) -> bool {
        let mut phase = self.phase();
        if phase.state != LifecycleState::Waiting {
            return false;
        }
        phase.state = LifecycleState::Activating;
        true
    }

    /// Start-up driver: install, then activate right away unless another
    /// version still controls clients.
    ///
    /// The store remembers which version last activated. When that is a
    /// different version, it keeps serving and this one stays `Waiting`
    /// until `SKIP_WAITING`.
    pub async fn register(&self) -> Result<InstallReport, Error> {
        let previous = match self.store.active().await {
            Ok(active) => active.filter(|v| *v != self.version),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read active cache version");
                None
            }
        };
        if let Some(previous) = &previous
            && self.clients.resume(previous)
        {
            tracing::debug!(version = %previous, "resumed previously active version");
        }

        let mut report = self.install().await?;

        if report.activation.is_none() {
            if previous.is_some() || self.clients.controlled_by_other(&self.version) {
                tracing::info!(version = %self.version, "new version waiting for SKIP_WAITING");
            } else if self.claim_activation() {
                report.activation = Some(self.run_activation().await);
            }
        }

        Ok(report)
    }

    /// Populate the current version from the static manifest.
    ///
    /// Only failing to open the version is fatal. Each manifest entry is
    /// isolated; the directory seed is silently best effort.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.set_state(LifecycleState::Installing);

        if let Err(e) = self.store.open(&self.version).await {
            tracing::error!(version = %self.version, error = %e, "failed to open cache version");
            self.set_state(LifecycleState::Idle);
            return Err(e);
        }

        let mut report = InstallReport {
            version: self.version.clone(),
            cached: Vec::new(),
            failed: Vec::new(),
            seeded: false,
            activation: None,
        };

        for (entry, resolved) in self.manifest.resolve() {
            let outcome = match resolved {
                Ok(url) => self.precache(&Request::get(url)).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => report.cached.push(entry.to_string()),
                Err(e) => {
                    tracing::warn!(version = %self.version, entry, error = %e, "precache failed, skipping entry");
                    report.failed.push(entry.to_string());
                }
            }
        }

        if let Some(seed) = &self.directory_seed {
            match self.precache(&Request::get(seed.clone())).await {
                Ok(()) => report.seeded = true,
                Err(e) => tracing::debug!(url = %seed, error = %e, "directory seed not stored"),
            }
        }

        let skip_requested = {
            let mut phase = self.phase();
            let requested = std::mem::take(&mut phase.skip_requested);
            phase.state = if requested { LifecycleState::Activating } else { LifecycleState::Waiting };
            requested
        };
        tracing::info!(
            version = %self.version,
            cached = report.cached.len(),
            failed = report.failed.len(),
            seeded = report.seeded,
            "install complete"
        );

        if skip_requested {
            report.activation = Some(self.run_activation().await);
        }

        Ok(report)
    }

    async fn precache(&self, request: &Request) -> Result<(), Error> {
        let response = self.network.fetch(request).await?;
        if !response.is_ok() {
            return Err(Error::HttpError(format!("status {} for {}", response.status, request.url())));
        }
        self.store.put(&self.version, &request.descriptor, &response).await
    }

    /// Activate unconditionally, whatever the current state.
    ///
    /// Start-up and `SKIP_WAITING` go through [`Self::register`] and
    /// [`Self::skip_waiting`], which only activate from `Waiting`.
    pub async fn activate(&self) -> ActivateReport {
        self.set_state(LifecycleState::Activating);
        self.run_activation().await
    }

    /// Record this version as active, delete every other version, then
    /// claim all clients.
    ///
    /// Store failures are logged; the claim always happens.
    async fn run_activation(&self) -> ActivateReport {
        if let Err(e) = self.store.set_active(&self.version).await {
            tracing::warn!(version = %self.version, error = %e, "failed to record active cache version");
        }

        let mut deleted = Vec::new();
        match self.store.versions().await {
            Ok(versions) => {
                for stale in versions.into_iter().filter(|v| *v != self.version) {
                    match self.store.delete_version(&stale).await {
                        Ok(true) => {
                            tracing::info!(version = %stale, "deleted stale cache version");
                            deleted.push(stale);
                        }
                        Ok(false) => {}
                        Err(e) => tracing::warn!(version = %stale, error = %e, "failed to delete cache version"),
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to enumerate cache versions"),
        }

        let claimed = self.clients.claim(&self.version);
        self.set_state(LifecycleState::Activated);
        tracing::info!(version = %self.version, claimed, deleted = deleted.len(), "activated");

        ActivateReport { deleted, claimed }
    }

    /// Handle a client message. Only `{"type": "SKIP_WAITING"}` does
    /// anything; every other shape is ignored.
    pub async fn on_message(&self, message: &Value) -> Option<ActivateReport> {
        match ClientMessage::parse(message) {
            Ok(ClientMessage::SkipWaiting) => self.skip_waiting().await,
            Err(e) => {
                tracing::debug!(error = %e, "ignoring client message");
                None
            }
        }
    }

    /// Activate a waiting version now. Before install completes the request
    /// is remembered; once activating or activated it is a no-op.
    pub async fn skip_waiting(&self) -> Option<ActivateReport> {
        {
            let mut phase = self.phase();
            match phase.state {
                LifecycleState::Waiting => phase.state = LifecycleState::Activating,
                LifecycleState::Idle | LifecycleState::Installing => {
                    phase.skip_requested = true;
                    return None;
                }
                LifecycleState::Activating | LifecycleState::Activated => return None,
            }
        }
        Some(self.run_activation().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ORIGIN, RecordingStore, ScriptedNetwork, StoreCall, ok, url};
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use waystation_core::CapturedResponse;

    const V4: &str = "custody-clarity-v4";

    fn manifest(entries: &[&str]) -> StaticManifest {
        StaticManifest::new(Url::parse(ORIGIN).unwrap(), entries.iter().map(|e| e.to_string()).collect())
    }

    fn controller(store: &Arc<RecordingStore>, network: &Arc<ScriptedNetwork>, entries: &[&str]) -> LifecycleController {
        LifecycleController::new(CacheVersion::new(V4), manifest(entries), store.clone(), network.clone())
    }

    #[tokio::test]
    async fn test_install_caches_manifest_and_waits() {
        let store = Arc::new(RecordingStore::new());
        let network = Arc::new(ScriptedNetwork::new());
        network.respond("/manifest.webmanifest", ok("{}"));
        network.respond("/icons/icon-192.png", ok("png"));

        let lifecycle = controller(&store, &network, &["/manifest.webmanifest", "/icons/icon-192.png"]);
        let report = lifecycle.install().await.unwrap();

        assert_eq!(report.cached, vec!["/manifest.webmanifest", "/icons/icon-192.png"]);
        assert!(report.failed.is_empty());
        assert!(report.activation.is_none());
        assert_eq!(lifecycle.state(), LifecycleState::Waiting);
        assert!(store.peek(V4, "/icons/icon-192.png").await.is_some());
        assert_eq!(store.calls()[0], StoreCall::Open(V4.to_string()));
    }

    #[tokio::test]
    async fn test_install_isolates_failed_entries() {
        let store = Arc::new(RecordingStore::new());
        let network = Arc::new(ScriptedNetwork::new());
        network.respond("/manifest.webmanifest", ok("{}"));
        network.respond("/missing-icon.png", CapturedResponse::new(404, vec![], "not found"));
        network.fail("/api/states");
        network.respond("/api/glossary?lang=en", ok("[]"));

        let lifecycle = controller(
            &store,
            &network,
            &["/manifest.webmanifest", "/missing-icon.png", "/api/states", "/api/glossary?lang=en"],
        );
        let report = lifecycle.install().await.unwrap();

        assert_eq!(report.cached, vec!["/manifest.webmanifest", "/api/glossary?lang=en"]);
        assert_eq!(report.failed, vec!["/missing-icon.png", "/api/states"]);
        assert_eq!(lifecycle.state(), LifecycleState::Waiting);
        assert!(store.peek(V4, "/missing-icon.png").await.is_none());
    }

    #[tokio::test]
    async fn test_install_unresolvable_entry_is_a_failure() {
        let store = Arc::new(RecordingStore::new());
        let network = Arc::new(ScriptedNetwork::new());

        let lifecycle = controller(&store, &network, &["http://[bad"]);
        let report = lifecycle.install().await.unwrap();

        assert_eq!(report.failed, vec!["http://[bad"]);
        assert_eq!(network.call_count(), 0);
    }

    #[tokio::test]
    async fn test_install_directory_seed_is_best_effort() {
        let store = Arc::new(RecordingStore::new());
        let network = Arc::new(ScriptedNetwork::new());
        network.fail("/api/directory?view=all");

        let lifecycle =
            controller(&store, &network, &[]).with_directory_seed(url("/api/directory?view=all"));
        let report = lifecycle.install().await.unwrap();
        assert!(!report.seeded);
        assert!(report.failed.is_empty());

        network.respond("/api/directory?view=all", ok("[]"));
        let report = lifecycle.install().await.unwrap();
        assert!(report.seeded);
        assert!(store.peek(V4, "/api/directory?view=all").await.is_some());
    }

    #[tokio::test]
    async fn test_install_twice_is_idempotent() {
        let store = Arc::new(RecordingStore::new());
        let network = Arc::new(ScriptedNetwork::new());
        network.respond("/manifest.webmanifest", ok("{}"));

        let lifecycle = controller(&store, &network, &["/manifest.webmanifest"]);
        let first = lifecycle.install().await.unwrap();
        let second = lifecycle.install().await.unwrap();

        assert_eq!(first, second);
        let keys = store.keys(&CacheVersion::new(V4)).await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(store.versions().await.unwrap(), vec![CacheVersion::new(V4)]);
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_versions_and_claims() {
        let store = Arc::new(RecordingStore::new());
        let network = Arc::new(ScriptedNetwork::new());
        store.seed("custody-clarity-v3", "/api/states", ok("old")).await;

        let clients = Arc::new(ClientRegistry::new());
        clients.claim(&CacheVersion::new("custody-clarity-v3"));
        let tab = clients.open();

        let lifecycle = controller(&store, &network, &[]).with_clients(clients.clone());
        lifecycle.install().await.unwrap();
        let report = lifecycle.activate().await;

        assert_eq!(report.deleted, vec![CacheVersion::new("custody-clarity-v3")]);
        assert_eq!(report.claimed, 1);
        assert_eq!(store.versions().await.unwrap(), vec![CacheVersion::new(V4)]);
        assert_eq!(clients.controller(tab), Some(CacheVersion::new(V4)));
        assert_eq!(lifecycle.state(), LifecycleState::Activated);
        assert_eq!(store.active().await.unwrap(), Some(CacheVersion::new(V4)));
    }

    #[tokio::test]
    async fn test_activate_claims_even_when_enumeration_fails() {
        let store = Arc::new(RecordingStore::new());
        let network = Arc::new(ScriptedNetwork::new());
        store.fail_versions.store(true, Ordering::SeqCst);
        let clients = Arc::new(ClientRegistry::new());
        clients.open();

        let lifecycle = controller(&store, &network, &[]).with_clients(clients);
        let report = lifecycle.activate().await;

        assert!(report.deleted.is_empty());
        assert_eq!(report.claimed, 1);
        assert_eq!(lifecycle.state(), LifecycleState::Activated);
    }

    #[tokio::test]
    async fn test_activate_claims_even_when_deletion_fails() {
        let store = Arc::new(RecordingStore::new());
        let network = Arc::new(ScriptedNetwork::new());
        store.seed("custody-clarity-v3", "/api/states", ok("old")).await;
        store.fail_delete_version.store(true, Ordering::SeqCst);

        let lifecycle = controller(&store, &network, &[]);
        lifecycle.install().await.unwrap();
        let report = lifecycle.activate().await;

        assert!(report.deleted.is_empty());
        assert_eq!(lifecycle.state(), LifecycleState::Activated);
    }

    #[tokio::test]
    async fn test_skip_waiting_activates_waiting_version() {
        let store = Arc::new(RecordingStore::new());
        let network = Arc::new(ScriptedNetwork::new());
        let lifecycle = controller(&store, &network, &[]);
        lifecycle.install().await.unwrap();

        let report = lifecycle.on_message(&json!({ "type": "SKIP_WAITING" })).await;

        assert!(report.is_some());
        assert_eq!(lifecycle.state(), LifecycleState::Activated);
        assert!(lifecycle.on_message(&json!({ "type": "SKIP_WAITING" })).await.is_none());
    }

    #[tokio::test]
    async fn test_other_messages_are_ignored() {
        let store = Arc::new(RecordingStore::new());
        let network = Arc::new(ScriptedNetwork::new());
        let lifecycle = controller(&store, &network, &[]);
        lifecycle.install().await.unwrap();

        for message in [json!({ "type": "RELOAD" }), json!("SKIP_WAITING"), json!({})] {
            assert!(lifecycle.on_message(&message).await.is_none());
        }
        assert_eq!(lifecycle.state(), LifecycleState::Waiting);
    }

    #[tokio::test]
    async fn test_skip_waiting_before_install_is_remembered() {
        let store = Arc::new(RecordingStore::new());
        let network = Arc::new(ScriptedNetwork::new());
        let lifecycle = controller(&store, &network, &[]);

        assert!(lifecycle.skip_waiting().await.is_none());
        let report = lifecycle.install().await.unwrap();

        assert!(report.activation.is_some());
        assert_eq!(lifecycle.state(), LifecycleState::Activated);
    }

    #[tokio::test]
    async fn test_register_first_version_activates() {
        let store = Arc::new(RecordingStore::new());
        let network = Arc::new(ScriptedNetwork::new());
        let clients = Arc::new(ClientRegistry::new());
        let tab = clients.open();

        let lifecycle = controller(&store, &network, &[]).with_clients(clients.clone());
        let report = lifecycle.register().await.unwrap();

        assert_eq!(report.activation.map(|a| a.claimed), Some(1));
        assert_eq!(clients.controller(tab), Some(CacheVersion::new(V4)));
    }

    #[tokio::test]
    async fn test_register_waits_while_old_version_controls_clients() {
        let store = Arc::new(RecordingStore::new());
        let network = Arc::new(ScriptedNetwork::new());
        store.seed("custody-clarity-v3", "/api/states", ok("old")).await;
        let clients = Arc::new(ClientRegistry::new());
        clients.claim(&CacheVersion::new("custody-clarity-v3"));
        clients.open();

        let lifecycle = controller(&store, &network, &[]).with_clients(clients.clone());
        let report = lifecycle.register().await.unwrap();

        assert!(report.activation.is_none());
        assert_eq!(lifecycle.state(), LifecycleState::Waiting);
        assert_eq!(store.versions().await.unwrap().len(), 2);

        let activation = lifecycle.on_message(&json!({ "type": "SKIP_WAITING" })).await.unwrap();
        assert_eq!(activation.deleted, vec![CacheVersion::new("custody-clarity-v3")]);
        assert_eq!(clients.active(), Some(CacheVersion::new(V4)));
    }

    #[tokio::test]
    async fn test_register_waits_for_previously_active_version() {
        let store = Arc::new(RecordingStore::new());
        let network = Arc::new(ScriptedNetwork::new());
        store.seed("custody-clarity-v3", "/api/states", ok("old")).await;
        store.seed_active("custody-clarity-v3").await;
        let v3 = CacheVersion::new("custody-clarity-v3");

        let lifecycle = controller(&store, &network, &[]);
        let report = lifecycle.register().await.unwrap();

        assert!(report.activation.is_none());
        assert_eq!(lifecycle.state(), LifecycleState::Waiting);
        assert_eq!(store.versions().await.unwrap(), vec![v3.clone(), CacheVersion::new(V4)]);
        assert_eq!(store.active().await.unwrap(), Some(v3.clone()));
        assert_eq!(lifecycle.clients().active(), Some(v3.clone()));

        let activation = lifecycle.on_message(&json!({ "type": "SKIP_WAITING" })).await.unwrap();
        assert_eq!(activation.deleted, vec![v3]);
        assert_eq!(lifecycle.state(), LifecycleState::Activated);
        assert_eq!(store.active().await.unwrap(), Some(CacheVersion::new(V4)));
        assert_eq!(store.versions().await.unwrap(), vec![CacheVersion::new(V4)]);
    }

    #[tokio::test]
    async fn test_register_restart_of_active_version_activates() {
        let store = Arc::new(RecordingStore::new());
        let network = Arc::new(ScriptedNetwork::new());
        store.seed_active(V4).await;

        let lifecycle = controller(&store, &network, &[]);
        let report = lifecycle.register().await.unwrap();

        let activation = report.activation.unwrap();
        assert!(activation.deleted.is_empty());
        assert_eq!(lifecycle.state(), LifecycleState::Activated);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_skip_waiting_activates_once() {
        let store = Arc::new(RecordingStore::new());
        let network = Arc::new(ScriptedNetwork::new());
        store.seed("custody-clarity-v3", "/api/states", ok("old")).await;
        let lifecycle = Arc::new(controller(&store, &network, &[]));
        lifecycle.install().await.unwrap();
        store.clear_log();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let lifecycle = lifecycle.clone();
                tokio::spawn(async move { lifecycle.skip_waiting().await })
            })
            .collect();
        let mut activations = 0;
        for task in tasks {
            if task.await.unwrap().is_some() {
                activations += 1;
            }
        }

        assert_eq!(activations, 1);
        let set_active = store.calls().iter().filter(|c| matches!(c, StoreCall::SetActive(_))).count();
        assert_eq!(set_active, 1);
        assert_eq!(lifecycle.state(), LifecycleState::Activated);
    }

    #[tokio::test]
    async fn test_skip_waiting_during_activation_is_ignored() {
        let store = Arc::new(RecordingStore::new());
        let network = Arc::new(ScriptedNetwork::new());
        let lifecycle = controller(&store, &network, &[]);
        lifecycle.install().await.unwrap();

        assert!(lifecycle.claim_activation());
        assert!(!lifecycle.claim_activation());
        assert!(lifecycle.skip_waiting().await.is_none());
        assert_eq!(lifecycle.state(), LifecycleState::Activating);
    }
}
