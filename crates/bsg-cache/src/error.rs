/// Errors from cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// Entries would expire immediately.
    #[error("cache '{name}': time-to-live must be greater than zero")]
    ZeroTtl { name: String },

    /// Entries would outlive what the clock can represent.
    #[error("cache '{name}': time-to-live {ttl:?} exceeds the maximum of {max:?}")]
    TtlTooLarge {
        name: String,
        ttl: std::time::Duration,
        max: std::time::Duration,
    },

    /// A bounded cache must hold at least one entry.
    #[error("cache '{name}': max_entries must be greater than zero")]
    ZeroCapacity { name: String },
}

pub type CacheResult<T> = Result<T, CacheError>;
