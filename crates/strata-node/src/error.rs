use strata_store::StoreError;
use uuid::Uuid;

use crate::schema::SchemaVersion;

/// Errors from decoding, encoding or loading nodes.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("unknown node type {0}")]
    UnknownNodeType(Uuid),

    #[error("unsupported schema version {version} for node type {guid}")]
    UnsupportedSchemaVersion { guid: Uuid, version: u64 },

    #[error("invalid child type tag {tag} at offset {offset}")]
    InvalidTypeTag { tag: u64, offset: usize },

    #[error("corrupt node at offset {offset}: {reason}")]
    Corrupt { offset: usize, reason: String },

    #[error("child is missing `{field}`, required by schema {version}")]
    MissingField {
        field: &'static str,
        version: SchemaVersion,
    },

    #[error("leaf {locator} is {actual} bytes but its reference says {expected}")]
    LengthMismatch {
        locator: strata_types::ObjectId,
        expected: u64,
        actual: u64,
    },

    #[error("file entry records {expected} bytes but its chunk tree holds {actual}")]
    FileLengthMismatch { expected: u64, actual: u64 },

    #[error("entry name {name:?} is not a single path component")]
    InvalidEntryName { name: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl NodeError {
    /// Whether this error means the stored bytes could not be understood,
    /// as opposed to an I/O or store failure.
    pub fn is_format_error(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

pub type NodeResult<T> = Result<T, NodeError>;
