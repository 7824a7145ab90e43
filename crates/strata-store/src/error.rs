use strata_types::ObjectId;

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(ObjectId),

    /// Blob data on disk does not match its locator (data corruption).
    #[error("corrupt blob {locator}: content hashes to {computed}")]
    CorruptBlob {
        locator: ObjectId,
        computed: ObjectId,
    },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking storage task panicked or was aborted.
    #[error("storage task failed: {0}")]
    TaskFailed(String),

    /// Storage backend is read-only or otherwise unavailable.
    #[error("store is read-only")]
    ReadOnly,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
