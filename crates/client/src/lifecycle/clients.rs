//! Open client sessions and the version controlling each.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use waystation_core::CacheVersion;

pub type ClientId = u64;

#[derive(Debug, Default)]
struct Sessions {
    active: Option<CacheVersion>,
    clients: BTreeMap<ClientId, Option<CacheVersion>>,
}

/// Registry of open clients.
///
/// A newly opened client is controlled by whichever version is active at
/// that moment (or none before the first activation). `claim` moves every
/// open client over to a version and makes it the active one.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    next_id: AtomicU64,
    sessions: RwLock<Sessions>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Sessions> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Sessions> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn open(&self) -> ClientId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut sessions = self.write();
        let controller = sessions.active.clone();
        sessions.clients.insert(id, controller);
        id
    }

    /// Returns whether the client was open.
    pub fn close(&self, id: ClientId) -> bool {
        self.write().clients.remove(&id).is_some()
    }

    /// Version controlling a client, `None` if uncontrolled or unknown.
    pub fn controller(&self, id: ClientId) -> Option<CacheVersion> {
        self.read().clients.get(&id).cloned().flatten()
    }

    pub fn active(&self) -> Option<CacheVersion> {
        self.read().active.clone()
    }

    /// Take control of every open client. Returns how many were claimed.
    pub fn claim(&self, version: &CacheVersion) -> usize {
        let mut sessions = self.write();
        sessions.active = Some(version.clone());
        for controller in sessions.clients.values_mut() {
            *controller = Some(version.clone());
        }
        sessions.clients.len()
    }

    /// Adopt a version a previous run left active, if nothing is active yet.
    ///
    /// Open uncontrolled clients come under its control. Returns whether it
    /// was adopted.
    pub fn resume(&self, version: &CacheVersion) -> bool {
        let mut sessions = self.write();
        if sessions.active.is_some() {
            return false;
        }
        sessions.active = Some(version.clone());
        for controller in sessions.clients.values_mut().filter(|c| c.is_none()) {
            *controller = Some(version.clone());
        }
        true
    }

    /// Whether any open client is controlled by a version other than `version`.
    pub fn controlled_by_other(&self, version: &CacheVersion) -> bool {
        self.read().clients.values().flatten().any(|controller| controller != version)
    }

    pub fn len(&self) -> usize {
        self.read().clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
