use bsg_types::BlobId;

/// Errors from blob store operations.
///
/// "Not found" on reads and deletes is not an error: those operations return
/// `Ok(None)` / `Ok(false)`. [`StoreError::BlobNotFound`] is reserved for
/// operations that cannot proceed without an existing blob, such as `copy`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An operation required an existing blob and none was found.
    #[error("blob not found: {0}")]
    BlobNotFound(BlobId),

    /// No member of a group could accept a write.
    #[error("unable to find a writable member blob store of group '{group}'")]
    NoWritableMember { group: String },

    /// The store is not in a state that accepts data-path calls.
    #[error("blob store '{store}' is not started (state: {state})")]
    NotStarted { store: String, state: String },

    /// The store does not accept writes.
    #[error("blob store '{0}' is read-only")]
    ReadOnly(String),

    /// Declared and actual content size disagree.
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other backend-specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
