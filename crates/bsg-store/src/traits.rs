use std::io::Read;
use std::path::Path;
use std::time::Duration;

use bsg_types::{BlobAttributes, BlobId, ContentHash, Headers};

use crate::blob::{Blob, BlobIdStream, BlobStoreMetrics};
use crate::error::StoreResult;

/// Backend store contract.
///
/// Implemented by every physical store and by the group router itself, so
/// groups can be treated uniformly with their members.
///
/// All implementations must satisfy these invariants:
/// - Absence is a normal result: reads return `Ok(None)`, deletes `Ok(false)`.
/// - `exists` reports soft-deleted blobs as present; only content reads
///   distinguish them through `include_deleted`.
/// - `is_writable` reflects the store's current state and may change over
///   its lifetime. Callers must not cache it.
/// - All I/O errors are propagated, never silently ignored.
pub trait BlobStore: Send + Sync {
    /// The configured name of this store.
    fn name(&self) -> &str;

    /// Whether the store currently accepts new blobs.
    fn is_writable(&self) -> bool;

    /// Whether the underlying storage is reachable.
    fn is_storage_available(&self) -> bool {
        true
    }

    /// Check whether a blob is present, including soft-deleted blobs.
    fn exists(&self, id: &BlobId) -> StoreResult<bool>;

    /// Fetch a live blob.
    fn get(&self, id: &BlobId) -> StoreResult<Option<Blob>> {
        self.get_with_deleted(id, false)
    }

    /// Fetch a blob, optionally including soft-deleted content.
    fn get_with_deleted(&self, id: &BlobId, include_deleted: bool) -> StoreResult<Option<Blob>>;

    /// Create a blob from a content stream.
    fn create(&self, content: &mut dyn Read, headers: &Headers) -> StoreResult<Blob>;

    /// Create a blob under a caller-chosen id, replacing any blob already
    /// stored under it.
    fn create_with_id(
        &self,
        id: BlobId,
        content: &mut dyn Read,
        headers: &Headers,
    ) -> StoreResult<Blob>;

    /// Create a blob from a file whose size and hash the caller already knows.
    fn create_from_path(
        &self,
        path: &Path,
        headers: &Headers,
        size: u64,
        hash: ContentHash,
    ) -> StoreResult<Blob>;

    /// Duplicate an existing blob under a new id with the given headers.
    fn copy(&self, id: &BlobId, headers: &Headers) -> StoreResult<Blob>;

    /// Soft-delete a blob. Returns `true` if the blob was present.
    fn delete(&self, id: &BlobId, reason: &str) -> StoreResult<bool>;

    /// Permanently remove a blob. Returns `true` if the blob was present.
    fn delete_hard(&self, id: &BlobId) -> StoreResult<bool>;

    /// Restore a soft-deleted blob. Returns `true` if the blob was deleted
    /// and is (or, with `dry_run`, would be) live again.
    fn undelete(&self, id: &BlobId, dry_run: bool) -> StoreResult<bool>;

    /// Lazily enumerate the ids of live blobs.
    fn blob_id_stream(&self) -> StoreResult<BlobIdStream>;

    /// Lazily enumerate the ids of live blobs created within the last
    /// `window`.
    fn blob_ids_updated_since(&self, window: Duration) -> StoreResult<BlobIdStream>;

    /// Read a blob's attributes.
    fn blob_attributes(&self, id: &BlobId) -> StoreResult<Option<BlobAttributes>>;

    /// Replace a blob's attributes. Returns `false` if the blob is absent.
    fn set_blob_attributes(&self, id: &BlobId, attributes: BlobAttributes) -> StoreResult<bool>;

    /// Storage statistics.
    fn metrics(&self) -> StoreResult<BlobStoreMetrics>;

    /// Returns `true` if the store holds no blobs.
    fn is_empty(&self) -> StoreResult<bool>;
}
