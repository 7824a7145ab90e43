use bytes::Bytes;
use serde::{Deserialize, Serialize};
use strata_types::ObjectId;

use crate::error::{NodeError, NodeResult};
use crate::schema::SchemaVersion;

/// Kind of node a [`ChildRef`] points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Raw chunk bytes, no header.
    Leaf,
    /// Ordered list of child references.
    Interior,
}

impl NodeKind {
    /// Wire type tag.
    pub fn tag(self) -> u64 {
        match self {
            Self::Leaf => 1,
            Self::Interior => 2,
        }
    }

    pub fn from_tag(tag: u64) -> Option<Self> {
        match tag {
            1 => Some(Self::Leaf),
            2 => Some(Self::Interior),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Leaf => write!(f, "leaf"),
            Self::Interior => write!(f, "interior"),
        }
    }
}

/// Where a node lives and what it contains.
///
/// `hash` is the plain BLAKE3 of the node payload and identifies the node.
/// `locator` is the key the blob store filed it under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobRef {
    pub hash: ObjectId,
    pub locator: ObjectId,
}

impl BlobRef {
    /// Encoded size on the wire.
    pub const ENCODED_LEN: usize = 64;

    pub fn new(hash: ObjectId, locator: ObjectId) -> Self {
        Self { hash, locator }
    }
}

/// Typed, hashed reference from an interior node to one of its children.
///
/// `length` and `rolling_hash` are optional because nodes written under
/// older schema revisions do not carry them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChildRef {
    pub kind: NodeKind,
    pub length: Option<u64>,
    pub rolling_hash: Option<u32>,
    pub blob: BlobRef,
}

impl ChildRef {
    pub fn leaf(blob: BlobRef, length: u64, rolling_hash: u32) -> Self {
        Self {
            kind: NodeKind::Leaf,
            length: Some(length),
            rolling_hash: Some(rolling_hash),
            blob,
        }
    }

    pub fn interior(blob: BlobRef, length: u64) -> Self {
        Self {
            kind: NodeKind::Interior,
            length: Some(length),
            rolling_hash: None,
            blob,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }

    /// Content hash of the referenced node.
    pub fn hash(&self) -> ObjectId {
        self.blob.hash
    }

    /// Store key of the referenced node.
    pub fn locator(&self) -> ObjectId {
        self.blob.locator
    }

    /// Fail unless every field `version` writes is present.
    pub(crate) fn check_encodable(&self, version: SchemaVersion) -> NodeResult<()> {
        if version.has_lengths() && self.length.is_none() {
            return Err(NodeError::MissingField {
                field: "length",
                version,
            });
        }
        if version.has_rolling_hashes() && self.is_leaf() && self.rolling_hash.is_none() {
            return Err(NodeError::MissingField {
                field: "rolling_hash",
                version,
            });
        }
        Ok(())
    }
}

/// One content-defined slice of an original stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafChunk {
    pub data: Bytes,
}

impl LeafChunk {
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }

    pub fn length(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Ordered sequence of child references.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InteriorNode {
    children: Vec<ChildRef>,
}

impl InteriorNode {
    pub fn new(children: Vec<ChildRef>) -> Self {
        Self { children }
    }

    pub fn children(&self) -> &[ChildRef] {
        &self.children
    }

    pub fn into_children(self) -> Vec<ChildRef> {
        self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Sum of the children's lengths, or `None` if any child predates
    /// stored lengths.
    pub fn length(&self) -> Option<u64> {
        self.children.iter().map(|c| c.length).sum()
    }
}

/// A decoded node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Leaf(LeafChunk),
    Interior(InteriorNode),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Leaf(_) => NodeKind::Leaf,
            Self::Interior(_) => NodeKind::Interior,
        }
    }

    /// Decode a blob as the given kind of node.
    ///
    /// Leaves are raw bytes. Interior blobs carry their own schema version,
    /// which is returned alongside for interior nodes.
    pub fn decode(kind: NodeKind, data: Bytes) -> NodeResult<(Self, Option<SchemaVersion>)> {
        match kind {
            NodeKind::Leaf => Ok((Self::Leaf(LeafChunk::new(data)), None)),
            NodeKind::Interior => {
                let (node, version) = InteriorNode::decode(&data)?;
                Ok((Self::Interior(node), Some(version)))
            }
        }
    }
}

/// Externally visible handle to a chunked stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkedData {
    /// BLAKE3 of the whole stream, independent of tree shape.
    pub digest: ObjectId,
    pub root: ChildRef,
}

impl ChunkedData {
    pub fn new(digest: ObjectId, root: ChildRef) -> Self {
        Self { digest, root }
    }

    /// Stream length, if the root records it.
    pub fn length(&self) -> Option<u64> {
        self.root.length
    }
}
