//! Location cache for blob store groups.
//!
//! A group remembers which member holds a blob so repeated reads skip the
//! member-by-member existence probe. The cache is only ever a hint: every
//! entry is confirmed against the named member before it is used, so an
//! empty, stale or wrong cache costs probes, never correctness.
//!
//! - [`LocationCache`] / [`CacheFactory`] -- the capabilities a group consumes
//! - [`TtlCache`] -- `DashMap`-backed cache with created-expiry entries
//! - [`TtlCacheFactory`] -- hands out caches shared by name

pub mod clock;
pub mod config;
pub mod error;
pub mod factory;
pub mod traits;
pub mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, DEFAULT_TTL, MAX_TTL};
pub use error::{CacheError, CacheResult};
pub use factory::TtlCacheFactory;
pub use traits::{CacheFactory, LocationCache};
pub use ttl::{CacheStats, TtlCache};
