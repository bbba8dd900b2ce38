use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{trace, warn};

use bsg_types::BlobId;

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::traits::LocationCache;

struct Entry {
    member: String,
    expires_at: Instant,
}

/// Point-in-time copy of a cache's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub expirations: u64,
    pub evictions: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
    expirations: AtomicU64,
    evictions: AtomicU64,
}

/// A [`LocationCache`] with created-expiry semantics.
///
/// Each entry expires a fixed `ttl` after it was recorded; lookups never
/// extend it. Expired entries are dropped lazily on lookup, or in bulk by
/// [`TtlCache::purge_expired`]. When `max_entries` is set and the cache is
/// full, expired entries are purged first and then the entry closest to
/// expiry is evicted.
pub struct TtlCache {
    name: String,
    ttl: Duration,
    max_entries: Option<usize>,
    entries: DashMap<BlobId, Entry>,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl TtlCache {
    /// Create a cache on the system clock. The config is assumed validated.
    pub fn new(name: impl Into<String>, config: &CacheConfig) -> Self {
        Self::with_clock(name, config, Arc::new(SystemClock))
    }

    pub fn with_clock(name: impl Into<String>, config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            ttl: config.ttl,
            max_entries: config.max_entries,
            entries: DashMap::new(),
            clock,
            counters: Counters::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drop every expired entry. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let purged = before.saturating_sub(self.entries.len());
        self.counters
            .expirations
            .fetch_add(purged as u64, Ordering::Relaxed);
        purged
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            insertions: self.counters.insertions.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }

    fn make_room(&self, incoming: &BlobId) {
        let Some(max) = self.max_entries else {
            return;
        };
        if self.entries.len() < max || self.entries.contains_key(incoming) {
            return;
        }
        self.purge_expired();
        while self.entries.len() >= max {
            // The iterator holds shard locks; release it before removing.
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.value().expires_at)
                .map(|e| e.key().clone());
            match oldest {
                Some(id) => {
                    if self.entries.remove(&id).is_some() {
                        self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                    }
                }
                None => break,
            }
        }
    }
}

impl LocationCache for TtlCache {
    fn lookup(&self, id: &BlobId) -> Option<String> {
        let now = self.clock.now();
        // Copy out before any removal: holding a `Ref` across `remove_if`
        // on the same shard deadlocks.
        let found = self
            .entries
            .get(id)
            .map(|e| (e.member.clone(), e.expires_at));
        match found {
            Some((member, expires_at)) if now < expires_at => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(member)
            }
            Some(_) => {
                if self
                    .entries
                    .remove_if(id, |_, e| e.expires_at <= now)
                    .is_some()
                {
                    self.counters.expirations.fetch_add(1, Ordering::Relaxed);
                }
                trace!(cache = %self.name, blob = %id, "location entry expired");
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn record(&self, id: BlobId, member: String) {
        let Some(expires_at) = self.clock.now().checked_add(self.ttl) else {
            warn!(cache = %self.name, ttl = ?self.ttl, "expiry not representable, not caching");
            return;
        };
        self.make_room(&id);
        self.entries.insert(id, Entry { member, expires_at });
        self.counters.insertions.fetch_add(1, Ordering::Relaxed);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Debug for TtlCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.len())
            .finish()
    }
}
