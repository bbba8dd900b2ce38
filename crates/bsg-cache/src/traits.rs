use std::sync::Arc;

use bsg_types::BlobId;

use crate::config::CacheConfig;
use crate::error::CacheResult;

/// Concurrent map from blob id to the name of the member holding it.
///
/// Implementations synchronise internally; callers never lock around them.
/// Entries are hints: a caller must confirm a looked-up member before
/// trusting it.
pub trait LocationCache: Send + Sync {
    /// The member name recorded for `id`, if present and not expired.
    fn lookup(&self, id: &BlobId) -> Option<String>;

    /// Record (or overwrite) the member holding `id`.
    fn record(&self, id: BlobId, member: String);

    /// Number of entries currently held, expired or not.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hands out named location caches.
pub trait CacheFactory: Send + Sync {
    /// Return the cache registered under `name`, creating it from `config`
    /// if it does not exist yet.
    fn maybe_create_cache(
        &self,
        name: &str,
        config: &CacheConfig,
    ) -> CacheResult<Arc<dyn LocationCache>>;
}
