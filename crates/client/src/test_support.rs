//! Fakes shared by the strategy, interceptor and lifecycle tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use url::Url;
use waystation_core::{
    CacheStore, CacheVersion, CapturedResponse, Error, MemoryStore, Request, RequestDescriptor,
};

use crate::fetch::Network;

pub(crate) const ORIGIN: &str = "https://app.example";

pub(crate) fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub(crate) fn ok(body: &str) -> CapturedResponse {
    CapturedResponse::new(200, vec![("content-type".into(), "text/plain".into())], body.to_string())
}

/// Network fake: responses are scripted per URL, unknown URLs fail like a
/// dropped connection.
#[derive(Default)]
pub(crate) struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Option<CapturedResponse>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, path: &str, response: CapturedResponse) {
        self.routes.lock().unwrap().insert(url(path).to_string(), Some(response));
    }

    pub(crate) fn fail(&self, path: &str) {
        self.routes.lock().unwrap().insert(url(path).to_string(), None);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<CapturedResponse, Error> {
        self.calls.lock().unwrap().push(request.descriptor.to_string());
        let scripted = self.routes.lock().unwrap().get(request.url().as_str()).cloned().flatten();
        scripted.ok_or_else(|| Error::HttpError(format!("network error: connection refused ({})", request.url())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreCall {
    Open(String),
    Get(String),
    Put(String),
    Delete(String),
    Keys(String),
    Versions,
    DeleteVersion(String),
    Active,
    SetActive(String),
}

/// [`MemoryStore`] wrapper that records every call and can be told to fail.
#[derive(Default)]
pub(crate) struct RecordingStore {
    inner: MemoryStore,
    log: Mutex<Vec<StoreCall>>,
    pub(crate) fail_puts: AtomicBool,
    pub(crate) fail_gets: AtomicBool,
    pub(crate) fail_versions: AtomicBool,
    pub(crate) fail_delete_version: AtomicBool,
}

impl RecordingStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> Vec<StoreCall> {
        self.log.lock().unwrap().clone()
    }

    pub(crate) fn puts(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, StoreCall::Put(_))).count()
    }

    pub(crate) fn gets(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, StoreCall::Get(_))).count()
    }

    pub(crate) fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }

    /// Seed an entry without recording the call.
    pub(crate) async fn seed(&self, version: &str, path: &str, response: CapturedResponse) {
        self.inner
            .put(&CacheVersion::new(version), &RequestDescriptor::get(url(path)), &response)
            .await
            .unwrap();
    }

    /// Record `version` as active without recording the call.
    pub(crate) async fn seed_active(&self, version: &str) {
        self.inner.set_active(&CacheVersion::new(version)).await.unwrap();
    }

    /// Read an entry without recording the call.
    pub(crate) async fn peek(&self, version: &str, path: &str) -> Option<CapturedResponse> {
        self.inner
            .get(&CacheVersion::new(version), &RequestDescriptor::get(url(path)))
            .await
            .unwrap()
    }

    fn record(&self, call: StoreCall) {
        self.log.lock().unwrap().push(call);
    }

    fn injected(flag: &AtomicBool, what: &str) -> Result<(), Error> {
        if flag.load(Ordering::SeqCst) {
            return Err(Error::Serialization(format!("injected {what} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for RecordingStore {
    async fn open(&self, version: &CacheVersion) -> Result<(), Error> {
        self.record(StoreCall::Open(version.to_string()));
        self.inner.open(version).await
    }

    async fn get(&self, version: &CacheVersion, key: &RequestDescriptor) -> Result<Option<CapturedResponse>, Error> {
        self.record(StoreCall::Get(key.url().to_string()));
        Self::injected(&self.fail_gets, "get")?;
        self.inner.get(version, key).await
    }

    async fn put(
        &self, version: &CacheVersion, key: &RequestDescriptor, response: &CapturedResponse,
    ) -> Result<(), Error> {
        self.record(StoreCall::Put(key.url().to_string()));
        Self::injected(&self.fail_puts, "put")?;
        self.inner.put(version, key, response).await
    }

    async fn delete(&self, version: &CacheVersion, key: &RequestDescriptor) -> Result<bool, Error> {
        self.record(StoreCall::Delete(key.url().to_string()));
        self.inner.delete(version, key).await
    }

    async fn keys(&self, version: &CacheVersion) -> Result<Vec<RequestDescriptor>, Error> {
        self.record(StoreCall::Keys(version.to_string()));
        self.inner.keys(version).await
    }

    async fn versions(&self) -> Result<Vec<CacheVersion>, Error> {
        self.record(StoreCall::Versions);
        Self::injected(&self.fail_versions, "versions")?;
        self.inner.versions().await
    }

    async fn delete_version(&self, version: &CacheVersion) -> Result<bool, Error> {
        self.record(StoreCall::DeleteVersion(version.to_string()));
        Self::injected(&self.fail_delete_version, "delete_version")?;
        self.inner.delete_version(version).await
    }

    async fn active(&self) -> Result<Option<CacheVersion>, Error> {
        self.record(StoreCall::Active);
        self.inner.active().await
    }

    async fn set_active(&self, version: &CacheVersion) -> Result<(), Error> {
        self.record(StoreCall::SetActive(version.to_string()));
        self.inner.set_active(version).await
    }
}
