use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{NodeError, NodeResult};
use crate::varint::{decode_varint, encode_varint};

/// Length of the GUID that opens every typed node blob.
pub const NODE_TYPE_GUID_LEN: usize = 16;

/// Schema revisions of the interior node format.
///
/// Each revision adds optional per-child fields. Readers dispatch on the
/// version stored in the blob, so data written under an older revision
/// stays readable after writers move on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SchemaVersion {
    /// `{blobRef, typeTag}` only.
    Initial = 1,
    /// Adds the subtree byte length of every child.
    AddLengths = 2,
    /// Adds the rolling hash at the cut point of every leaf child.
    AddRollingHashes = 3,
}

impl SchemaVersion {
    /// The revision new writers target unless told otherwise.
    pub const LATEST: Self = Self::AddRollingHashes;

    pub fn as_u64(self) -> u64 {
        self as u64
    }

    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::Initial),
            2 => Some(Self::AddLengths),
            3 => Some(Self::AddRollingHashes),
            _ => None,
        }
    }

    /// Whether child entries carry a length field.
    pub fn has_lengths(self) -> bool {
        self >= Self::AddLengths
    }

    /// Whether leaf child entries carry a rolling hash field.
    pub fn has_rolling_hashes(self) -> bool {
        self >= Self::AddRollingHashes
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::LATEST
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::AddLengths => "add-lengths",
            Self::AddRollingHashes => "add-rolling-hashes",
        };
        write!(f, "v{} ({name})", self.as_u64())
    }
}

/// Declared type of a stored node: a GUID naming the format plus the
/// integer schema version it was written with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeType {
    pub guid: Uuid,
    pub version: u64,
}

impl NodeType {
    /// Interior nodes of a chunk tree.
    pub const INTERIOR_GUID: Uuid = Uuid::from_u128(0x7c3f_5a1e_92d4_4b8a_a6e1_3d0f_c2b9_8e47);
    /// Directory listings.
    pub const DIRECTORY_GUID: Uuid = Uuid::from_u128(0x1b8e_0d6c_4f2a_47e9_9c35_a7d2_e4f1_6b03);

    pub fn new(guid: Uuid, version: u64) -> Self {
        Self { guid, version }
    }

    pub fn interior(version: SchemaVersion) -> Self {
        Self::new(Self::INTERIOR_GUID, version.as_u64())
    }

    /// Append the header (GUID then varint version) to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.guid.as_bytes());
        encode_varint(buf, self.version);
    }

    /// Parse a header from the front of `data`.
    ///
    /// Returns the type and the number of bytes consumed.
    pub fn decode(data: &[u8]) -> NodeResult<(Self, usize)> {
        let guid_bytes = data.get(..NODE_TYPE_GUID_LEN).ok_or_else(|| NodeError::Corrupt {
            offset: 0,
            reason: format!("need {NODE_TYPE_GUID_LEN} header bytes, have {}", data.len()),
        })?;
        let guid = Uuid::from_slice(guid_bytes).map_err(|e| NodeError::Corrupt {
            offset: 0,
            reason: e.to_string(),
        })?;
        let (version, used) = decode_varint(data, NODE_TYPE_GUID_LEN)?;
        Ok((Self { guid, version }, NODE_TYPE_GUID_LEN + used))
    }

    /// Check the GUID and map the version onto a known interior schema.
    pub fn interior_schema(&self) -> NodeResult<SchemaVersion> {
        if self.guid != Self::INTERIOR_GUID {
            return Err(NodeError::UnknownNodeType(self.guid));
        }
        SchemaVersion::from_u64(self.version).ok_or(NodeError::UnsupportedSchemaVersion {
            guid: self.guid,
            version: self.version,
        })
    }
}
