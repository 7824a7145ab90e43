use std::path::PathBuf;

use strata_chunk::ChunkError;
use strata_node::NodeError;
use strata_store::StoreError;
use strata_types::ObjectId;

/// Errors from extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// A fetched chunk does not hash to the value its reference records.
    #[error("hash mismatch in {} at offset {offset}: expected {expected}, got {actual}", path.display())]
    HashMismatch {
        path: PathBuf,
        offset: u64,
        expected: ObjectId,
        actual: ObjectId,
    },

    /// A finished file does not hash to its recorded digest.
    #[error("{} does not match its digest: expected {expected}, got {actual}", path.display())]
    OutputMismatch {
        path: PathBuf,
        expected: ObjectId,
        actual: ObjectId,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("extraction cancelled")]
    Cancelled,

    #[error("invalid extract options: {0}")]
    InvalidOptions(String),

    #[error("invalid extract config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("pipeline task failed: {0}")]
    TaskFailed(String),

    /// Stored data could not be decoded.
    #[error("format error: {0}")]
    Format(#[from] NodeError),

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type ExtractResult<T> = Result<T, ExtractError>;
