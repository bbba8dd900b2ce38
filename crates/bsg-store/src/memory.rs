use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use tracing::debug;

use bsg_types::{BlobAttributes, BlobId, BlobMetrics, ContentHash, Headers};

use crate::blob::{Blob, BlobIdStream, BlobStoreMetrics};
use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;

struct StoredBlob {
    content: Bytes,
    attributes: BlobAttributes,
}

impl StoredBlob {
    fn to_blob(&self, id: &BlobId) -> Blob {
        Blob::new(
            id.clone(),
            self.attributes.headers.clone(),
            self.attributes.metrics.clone(),
            self.content.clone(),
        )
    }
}

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. Blobs are held behind a `RwLock` for safe
/// concurrent access; content is shared `Bytes`, so reads do not copy it.
/// Supports soft delete, a toggleable writable flag and an optional byte
/// capacity.
pub struct InMemoryBlobStore {
    name: String,
    writable: AtomicBool,
    capacity: Option<u64>,
    blobs: RwLock<HashMap<BlobId, StoredBlob>>,
}

impl InMemoryBlobStore {
    /// Create a new empty, writable, unlimited store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            writable: AtomicBool::new(true),
            capacity: None,
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new empty store that rejects writes.
    pub fn read_only(name: impl Into<String>) -> Self {
        let store = Self::new(name);
        store.set_writable(false);
        store
    }

    /// Create a new empty, writable store limited to `capacity` bytes.
    pub fn with_capacity(name: impl Into<String>, capacity: u64) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new(name)
        }
    }

    /// Switch the store between writable and read-only.
    pub fn set_writable(&self, writable: bool) {
        self.writable.store(writable, Ordering::SeqCst);
    }

    /// Insert a blob under a caller-chosen id, bypassing the writable check.
    ///
    /// Used to seed fixtures and to simulate blobs placed out-of-band.
    pub fn put(&self, id: BlobId, content: impl Into<Bytes>, headers: Headers) -> Blob {
        let content = content.into();
        let metrics = BlobMetrics::new(ContentHash::of(&content), content.len() as u64);
        let stored = StoredBlob {
            content,
            attributes: BlobAttributes::new(headers, metrics),
        };
        let blob = stored.to_blob(&id);
        self.blobs
            .write()
            .expect("lock poisoned")
            .insert(id, stored);
        blob
    }

    /// Number of blobs held, including soft-deleted ones.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Sorted ids of all blobs held, including soft-deleted ones.
    pub fn all_ids(&self) -> Vec<BlobId> {
        let mut ids: Vec<BlobId> = self
            .blobs
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Sorted ids of live blobs accepted by `keep`.
    fn live_ids(&self, keep: impl Fn(&StoredBlob) -> bool) -> BlobIdStream {
        let map = self.blobs.read().expect("lock poisoned");
        let mut ids: Vec<BlobId> = map
            .iter()
            .filter(|(_, stored)| !stored.attributes.deleted && keep(stored))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Box::new(ids.into_iter().map(Ok))
    }

    fn used_bytes(map: &HashMap<BlobId, StoredBlob>) -> u64 {
        map.values().map(|b| b.content.len() as u64).sum()
    }

    fn ensure_writable(&self) -> StoreResult<()> {
        if self.is_writable() {
            Ok(())
        } else {
            Err(StoreError::ReadOnly(self.name.clone()))
        }
    }

    fn insert_new(&self, content: Bytes, headers: &Headers, hash: ContentHash) -> StoreResult<Blob> {
        self.insert_as(BlobId::random(), content, headers, hash)
    }

    fn insert_as(
        &self,
        id: BlobId,
        content: Bytes,
        headers: &Headers,
        hash: ContentHash,
    ) -> StoreResult<Blob> {
        let mut map = self.blobs.write().expect("lock poisoned");
        if let Some(capacity) = self.capacity {
            let replaced = map.get(&id).map_or(0, |b| b.content.len() as u64);
            if Self::used_bytes(&map) - replaced + content.len() as u64 > capacity {
                return Err(StoreError::Backend(format!(
                    "blob store '{}' is full",
                    self.name
                )));
            }
        }
        let metrics = BlobMetrics::new(hash, content.len() as u64);
        let stored = StoredBlob {
            content,
            attributes: BlobAttributes::new(headers.clone(), metrics),
        };
        let blob = stored.to_blob(&id);
        map.insert(id, stored);
        debug!(store = %self.name, blob = %blob.id, size = blob.size(), "created blob");
        Ok(blob)
    }
}

impl BlobStore for InMemoryBlobStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_writable(&self) -> bool {
        self.writable.load(Ordering::SeqCst)
    }

    fn exists(&self, id: &BlobId) -> StoreResult<bool> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }

    fn get_with_deleted(&self, id: &BlobId, include_deleted: bool) -> StoreResult<Option<Blob>> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map
            .get(id)
            .filter(|stored| include_deleted || !stored.attributes.deleted)
            .map(|stored| stored.to_blob(id)))
    }

    fn create(&self, content: &mut dyn Read, headers: &Headers) -> StoreResult<Blob> {
        self.ensure_writable()?;
        let mut data = Vec::new();
        content.read_to_end(&mut data)?;
        let hash = ContentHash::of(&data);
        self.insert_new(Bytes::from(data), headers, hash)
    }

    fn create_with_id(
        &self,
        id: BlobId,
        content: &mut dyn Read,
        headers: &Headers,
    ) -> StoreResult<Blob> {
        self.ensure_writable()?;
        let mut data = Vec::new();
        content.read_to_end(&mut data)?;
        let hash = ContentHash::of(&data);
        self.insert_as(id, Bytes::from(data), headers, hash)
    }

    fn create_from_path(
        &self,
        path: &Path,
        headers: &Headers,
        size: u64,
        hash: ContentHash,
    ) -> StoreResult<Blob> {
        self.ensure_writable()?;
        let data = std::fs::read(path)?;
        let actual = data.len() as u64;
        if actual != size {
            return Err(StoreError::SizeMismatch {
                expected: size,
                actual,
            });
        }
        self.insert_new(Bytes::from(data), headers, hash)
    }

    fn copy(&self, id: &BlobId, headers: &Headers) -> StoreResult<Blob> {
        self.ensure_writable()?;
        let (content, hash) = {
            let map = self.blobs.read().expect("lock poisoned");
            let source = map
                .get(id)
                .filter(|stored| !stored.attributes.deleted)
                .ok_or_else(|| StoreError::BlobNotFound(id.clone()))?;
            (source.content.clone(), source.attributes.metrics.hash)
        };
        self.insert_new(content, headers, hash)
    }

    fn delete(&self, id: &BlobId, reason: &str) -> StoreResult<bool> {
        let mut map = self.blobs.write().expect("lock poisoned");
        match map.get_mut(id) {
            Some(stored) => {
                stored.attributes.mark_deleted(reason);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_hard(&self, id: &BlobId) -> StoreResult<bool> {
        let mut map = self.blobs.write().expect("lock poisoned");
        Ok(map.remove(id).is_some())
    }

    fn undelete(&self, id: &BlobId, dry_run: bool) -> StoreResult<bool> {
        let mut map = self.blobs.write().expect("lock poisoned");
        match map.get_mut(id) {
            Some(stored) if stored.attributes.deleted => {
                if !dry_run {
                    stored.attributes.undelete();
                    debug!(store = %self.name, blob = %id, "undeleted blob");
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn blob_id_stream(&self) -> StoreResult<BlobIdStream> {
        Ok(self.live_ids(|_| true))
    }

    fn blob_ids_updated_since(&self, window: Duration) -> StoreResult<BlobIdStream> {
        // A window reaching before the representable range covers everything.
        let cutoff = chrono::Duration::from_std(window)
            .ok()
            .and_then(|w| Utc::now().checked_sub_signed(w));
        Ok(self.live_ids(|stored| {
            cutoff.map_or(true, |c| stored.attributes.metrics.creation_time >= c)
        }))
    }

    fn blob_attributes(&self, id: &BlobId) -> StoreResult<Option<BlobAttributes>> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.get(id).map(|stored| stored.attributes.clone()))
    }

    fn set_blob_attributes(&self, id: &BlobId, attributes: BlobAttributes) -> StoreResult<bool> {
        let mut map = self.blobs.write().expect("lock poisoned");
        match map.get_mut(id) {
            Some(stored) => {
                stored.attributes = attributes;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn metrics(&self) -> StoreResult<BlobStoreMetrics> {
        let map = self.blobs.read().expect("lock poisoned");
        let live = map.values().filter(|stored| !stored.attributes.deleted);
        let (blob_count, total_size) =
            live.fold((0u64, 0u64), |(n, size), stored| {
                (n + 1, size + stored.content.len() as u64)
            });
        let used = Self::used_bytes(&map);
        Ok(BlobStoreMetrics {
            blob_count,
            total_size,
            available_space: self.capacity.map_or(0, |c| c.saturating_sub(used)),
            unlimited: self.capacity.is_none(),
        })
    }

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.blobs.read().expect("lock poisoned").is_empty())
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("name", &self.name)
            .field("writable", &self.is_writable())
            .field("blob_count", &self.len())
            .finish()
    }
}
