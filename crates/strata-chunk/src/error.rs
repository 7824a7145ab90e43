use strata_node::NodeError;
use strata_store::StoreError;
use strata_types::ObjectId;

/// Errors from chunking, tree building and reconstruction.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    #[error("invalid chunking options: {0}")]
    InvalidOptions(String),

    #[error("hash mismatch for blob {locator}: expected {expected}, got {actual}")]
    HashMismatch {
        locator: ObjectId,
        expected: ObjectId,
        actual: ObjectId,
    },

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    TaskFailed(String),
}

pub type ChunkResult<T> = Result<T, ChunkError>;
