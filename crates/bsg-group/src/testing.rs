//! Test doubles shared by the unit tests of this crate.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bsg_cache::{TtlCache, TtlCacheFactory};
use bsg_store::{
    Blob, BlobIdStream, BlobStore, BlobStoreMetrics, InMemoryBlobStore, InMemoryRegistry,
    StoreError, StoreResult,
};
use bsg_types::{BlobAttributes, BlobId, ContentHash, Headers};

use crate::config::{GroupConfiguration, GroupSettings, CACHE_NAME};
use crate::fill_policy::{FillPolicies, FillPolicy};
use crate::group::GroupStore;

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

/// An in-memory member that counts calls per operation and can be told to
/// fail.
pub(crate) struct ProbeStore {
    inner: InMemoryBlobStore,
    calls: Mutex<HashMap<&'static str, usize>>,
    fail_deletes: AtomicBool,
    error_on_delete: AtomicBool,
    error_on_exists: AtomicBool,
    error_on_get: AtomicBool,
    fail_stream_after: Mutex<Option<usize>>,
}

impl ProbeStore {
    pub(crate) fn writable(name: &str) -> Self {
        Self {
            inner: InMemoryBlobStore::new(name),
            calls: Mutex::new(HashMap::new()),
            fail_deletes: AtomicBool::new(false),
            error_on_delete: AtomicBool::new(false),
            error_on_exists: AtomicBool::new(false),
            error_on_get: AtomicBool::new(false),
            fail_stream_after: Mutex::new(None),
        }
    }

    pub(crate) fn read_only(name: &str) -> Self {
        let store = Self::writable(name);
        store.inner.set_writable(false);
        store
    }

    /// Place a blob whose content is its own id.
    pub(crate) fn seed(&self, id: &str) -> Blob {
        self.inner
            .put(BlobId::new(id), id.as_bytes().to_vec(), Headers::new())
    }

    pub(crate) fn set_writable(&self, writable: bool) {
        self.inner.set_writable(writable);
    }

    /// Member-level deletes report `false`.
    pub(crate) fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    /// Member-level deletes fail with a backend error.
    pub(crate) fn error_on_delete(&self) {
        self.error_on_delete.store(true, Ordering::SeqCst);
    }

    pub(crate) fn error_on_exists(&self) {
        self.error_on_exists.store(true, Ordering::SeqCst);
    }

    pub(crate) fn error_on_get(&self) {
        self.error_on_get.store(true, Ordering::SeqCst);
    }

    /// The id stream yields `n` ids and then an error; `0` fails on open.
    pub(crate) fn fail_stream_after(&self, n: usize) {
        *self.fail_stream_after.lock().unwrap() = Some(n);
    }

    pub(crate) fn calls(&self, op: &str) -> usize {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    pub(crate) fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn count(&self, op: &'static str) {
        *self.calls.lock().unwrap().entry(op).or_insert(0) += 1;
    }

    fn backend_error(&self, op: &str) -> StoreError {
        StoreError::Backend(format!("{} failed in {}", op, self.inner.name()))
    }
}

impl BlobStore for ProbeStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_writable(&self) -> bool {
        self.inner.is_writable()
    }

    fn exists(&self, id: &BlobId) -> StoreResult<bool> {
        self.count("exists");
        if self.error_on_exists.load(Ordering::SeqCst) {
            return Err(self.backend_error("exists"));
        }
        self.inner.exists(id)
    }

    fn get(&self, id: &BlobId) -> StoreResult<Option<Blob>> {
        self.count("get");
        if self.error_on_get.load(Ordering::SeqCst) {
            return Err(self.backend_error("get"));
        }
        self.inner.get(id)
    }

    fn get_with_deleted(&self, id: &BlobId, include_deleted: bool) -> StoreResult<Option<Blob>> {
        self.count("get_with_deleted");
        if self.error_on_get.load(Ordering::SeqCst) {
            return Err(self.backend_error("get"));
        }
        self.inner.get_with_deleted(id, include_deleted)
    }

    fn create(&self, content: &mut dyn Read, headers: &Headers) -> StoreResult<Blob> {
        self.count("create");
        self.inner.create(content, headers)
    }

    fn create_with_id(
        &self,
        id: BlobId,
        content: &mut dyn Read,
        headers: &Headers,
    ) -> StoreResult<Blob> {
        self.count("create_with_id");
        self.inner.create_with_id(id, content, headers)
    }

    fn create_from_path(
        &self,
        path: &Path,
        headers: &Headers,
        size: u64,
        hash: ContentHash,
    ) -> StoreResult<Blob> {
        self.count("create_from_path");
        self.inner.create_from_path(path, headers, size, hash)
    }

    fn copy(&self, id: &BlobId, headers: &Headers) -> StoreResult<Blob> {
        self.count("copy");
        self.inner.copy(id, headers)
    }

    fn delete(&self, id: &BlobId, reason: &str) -> StoreResult<bool> {
        self.count("delete");
        if self.error_on_delete.load(Ordering::SeqCst) {
            return Err(self.backend_error("delete"));
        }
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.delete(id, reason)
    }

    fn delete_hard(&self, id: &BlobId) -> StoreResult<bool> {
        self.count("delete_hard");
        if self.error_on_delete.load(Ordering::SeqCst) {
            return Err(self.backend_error("delete_hard"));
        }
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.delete_hard(id)
    }

    fn blob_id_stream(&self) -> StoreResult<BlobIdStream> {
        self.count("blob_id_stream");
        let limit = *self.fail_stream_after.lock().unwrap();
        match limit {
            None => self.inner.blob_id_stream(),
            Some(0) => Err(self.backend_error("blob_id_stream")),
            Some(n) => {
                let error = self.backend_error("blob_id_stream");
                let ids = self.inner.blob_id_stream()?.take(n);
                Ok(Box::new(ids.chain(std::iter::once(Err(error)))))
            }
        }
    }

    fn undelete(&self, id: &BlobId, dry_run: bool) -> StoreResult<bool> {
        self.count("undelete");
        self.inner.undelete(id, dry_run)
    }

    fn blob_ids_updated_since(&self, window: Duration) -> StoreResult<BlobIdStream> {
        self.count("blob_ids_updated_since");
        self.inner.blob_ids_updated_since(window)
    }

    fn blob_attributes(&self, id: &BlobId) -> StoreResult<Option<BlobAttributes>> {
        self.count("blob_attributes");
        self.inner.blob_attributes(id)
    }

    fn set_blob_attributes(&self, id: &BlobId, attributes: BlobAttributes) -> StoreResult<bool> {
        self.count("set_blob_attributes");
        self.inner.set_blob_attributes(id, attributes)
    }

    fn metrics(&self) -> StoreResult<BlobStoreMetrics> {
        self.inner.metrics()
    }

    fn is_empty(&self) -> StoreResult<bool> {
        self.inner.is_empty()
    }
}

/// Name and writability of a member to build.
pub(crate) struct TestMember {
    name: &'static str,
    writable: bool,
}

impl TestMember {
    pub(crate) fn writable(name: &'static str) -> Self {
        Self {
            name,
            writable: true,
        }
    }

    pub(crate) fn read_only(name: &'static str) -> Self {
        Self {
            name,
            writable: false,
        }
    }
}

/// A group wired to probe members, an in-memory registry and a TTL cache
/// factory. Not yet configured.
pub(crate) struct Fixture {
    pub(crate) group: GroupStore,
    pub(crate) registry: Arc<InMemoryRegistry>,
    pub(crate) caches: Arc<TtlCacheFactory>,
    pub(crate) members: Vec<Arc<ProbeStore>>,
}

impl Fixture {
    pub(crate) fn new(members: &[TestMember], policies: FillPolicies) -> Self {
        init_tracing();
        let registry = Arc::new(InMemoryRegistry::new());
        let probes: Vec<Arc<ProbeStore>> = members
            .iter()
            .map(|m| {
                let probe = if m.writable {
                    ProbeStore::writable(m.name)
                } else {
                    ProbeStore::read_only(m.name)
                };
                Arc::new(probe)
            })
            .collect();
        for probe in &probes {
            registry.register(probe.clone());
        }
        let caches = Arc::new(TtlCacheFactory::new());
        let group = GroupStore::new(
            "group",
            registry.clone(),
            policies,
            caches.clone(),
            GroupSettings::default(),
        );
        Self {
            group,
            registry,
            caches,
            members: probes,
        }
    }

    /// Configure with every member in order and start.
    pub(crate) fn start(self, fill_policy: Option<&str>) -> Self {
        let names: Vec<&str> = self.members.iter().map(|m| m.name()).collect();
        self.group
            .configure(GroupConfiguration::new(names, fill_policy))
            .unwrap();
        self.group.start().unwrap();
        self
    }

    pub(crate) fn member(&self, name: &str) -> &Arc<ProbeStore> {
        self.members
            .iter()
            .find(|m| m.name() == name)
            .unwrap_or_else(|| panic!("no member named {name}"))
    }

    pub(crate) fn cache(&self) -> Arc<TtlCache> {
        self.caches.get(CACHE_NAME).expect("cache created on start")
    }

    pub(crate) fn reset_calls(&self) {
        for member in &self.members {
            member.reset_calls();
        }
    }
}

/// A started group with the built-in policies and every member configured.
pub(crate) fn group_with(members: &[TestMember]) -> (GroupStore, Vec<Arc<ProbeStore>>) {
    let fixture = Fixture::new(members, FillPolicies::builtin()).start(None);
    (fixture.group, fixture.members)
}

/// A fill policy that records its invocations and always picks one member
/// by name.
pub(crate) struct RecordingFillPolicy {
    target: String,
    calls: Mutex<Vec<(String, Headers)>>,
}

impl RecordingFillPolicy {
    pub(crate) fn new(target: &str) -> Self {
        Self {
            target: target.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(group name, hints)` of every call so far.
    pub(crate) fn calls(&self) -> Vec<(String, Headers)> {
        self.calls.lock().unwrap().clone()
    }
}

impl FillPolicy for RecordingFillPolicy {
    fn name(&self) -> &str {
        "test"
    }

    fn choose_member(&self, group: &GroupStore, hints: &Headers) -> Option<Arc<dyn BlobStore>> {
        self.calls
            .lock()
            .unwrap()
            .push((group.name().to_string(), hints.clone()));
        group
            .members()
            .into_iter()
            .find(|m| m.name() == self.target)
    }
}
