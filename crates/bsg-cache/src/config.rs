use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};

/// Default time-to-live of a location entry: two days.
pub const DEFAULT_TTL: Duration = Duration::from_secs(2 * 24 * 60 * 60);

/// Longest accepted time-to-live: one hundred years.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Configuration for a location cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of an entry, measured from insertion. Reads do not extend it.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// Optional upper bound on the number of entries.
    #[serde(default)]
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_entries: None,
        }
    }
}

impl CacheConfig {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Default::default()
        }
    }

    pub fn validate(&self, name: &str) -> CacheResult<()> {
        if self.ttl.is_zero() {
            return Err(CacheError::ZeroTtl { name: name.into() });
        }
        if self.ttl > MAX_TTL {
            return Err(CacheError::TtlTooLarge {
                name: name.into(),
                ttl: self.ttl,
                max: MAX_TTL,
            });
        }
        if self.max_entries == Some(0) {
            return Err(CacheError::ZeroCapacity { name: name.into() });
        }
        Ok(())
    }
}
