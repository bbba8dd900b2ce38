use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::CacheResult;
use crate::traits::{CacheFactory, LocationCache};
use crate::ttl::TtlCache;

/// Creates [`TtlCache`]s and shares them by name.
///
/// Asking twice for the same name returns the same cache; the config of the
/// second request is ignored.
pub struct TtlCacheFactory {
    caches: DashMap<String, Arc<TtlCache>>,
    clock: Arc<dyn Clock>,
}

impl TtlCacheFactory {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            caches: DashMap::new(),
            clock,
        }
    }

    /// The concrete cache registered under `name`, for statistics.
    pub fn get(&self, name: &str) -> Option<Arc<TtlCache>> {
        self.caches.get(name).map(|c| Arc::clone(c.value()))
    }

    /// Forget a cache. Holders of the `Arc` keep their copy alive.
    pub fn destroy(&self, name: &str) -> bool {
        self.caches.remove(name).is_some()
    }
}

impl Default for TtlCacheFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheFactory for TtlCacheFactory {
    fn maybe_create_cache(
        &self,
        name: &str,
        config: &CacheConfig,
    ) -> CacheResult<Arc<dyn LocationCache>> {
        config.validate(name)?;
        let cache: Arc<dyn LocationCache> = self
            .caches
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(cache = name, ttl = ?config.ttl, "creating location cache");
                Arc::new(TtlCache::with_clock(name, config, Arc::clone(&self.clock)))
            })
            .value()
            .clone();
        Ok(cache)
    }
}

impl fmt::Debug for TtlCacheFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.caches.iter().map(|c| c.key().clone()).collect();
        f.debug_struct("TtlCacheFactory")
            .field("caches", &names)
            .finish()
    }
}
