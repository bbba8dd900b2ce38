use bsg_cache::CacheError;

use crate::lifecycle::GroupState;

/// Errors from group configuration and lifecycle transitions.
///
/// Data-path operations report [`bsg_store::StoreError`] instead, so a group
/// honours the same contract as any member store.
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    /// The group configuration is malformed.
    #[error("invalid group configuration: {0}")]
    InvalidConfiguration(String),

    /// A configured member name could not be resolved to a live store.
    #[error("blob store '{member}' not found for group '{group}'")]
    MemberNotFound { group: String, member: String },

    /// The requested lifecycle transition is not allowed from the current state.
    #[error("group '{group}' cannot {operation} while {state}")]
    InvalidState {
        group: String,
        operation: &'static str,
        state: GroupState,
    },

    /// The location cache could not be created.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Group settings could not be loaded.
    #[error("settings error: {0}")]
    Settings(String),
}

/// Result alias for group lifecycle operations.
pub type GroupResult<T> = Result<T, GroupError>;
