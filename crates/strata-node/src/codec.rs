//! Versioned wire format for interior nodes.
//!
//! ```text
//! [16-byte type GUID][varint schema version]
//! repeated until end of blob:
//!   [32-byte hash][32-byte locator][varint type tag]
//!   [varint length]          if version >= AddLengths
//!   [u32 LE rolling hash]    if version >= AddRollingHashes and tag == Leaf
//! ```

use bytes::Bytes;
use strata_types::{ObjectId, OBJECT_ID_LEN};

use crate::error::{NodeError, NodeResult};
use crate::node::{BlobRef, ChildRef, InteriorNode, NodeKind};
use crate::schema::{NodeType, SchemaVersion};
use crate::varint::{decode_varint, encode_varint};

impl InteriorNode {
    /// Serialize this node targeting `version`.
    ///
    /// Fails if a child lacks a field the target revision requires.
    pub fn encode(&self, version: SchemaVersion) -> NodeResult<Bytes> {
        let mut buf = Vec::with_capacity(32 + self.len() * (BlobRef::ENCODED_LEN + 8));
        NodeType::interior(version).encode(&mut buf);
        for child in self.children() {
            child.check_encodable(version)?;
            encode_child(&mut buf, child, version);
        }
        Ok(Bytes::from(buf))
    }

    /// Parse an interior node blob, returning the schema it was written with.
    pub fn decode(data: &[u8]) -> NodeResult<(Self, SchemaVersion)> {
        let (node_type, mut offset) = NodeType::decode(data)?;
        let version = node_type.interior_schema()?;

        let mut children = Vec::new();
        while offset < data.len() {
            let (child, used) = decode_child(data, offset, version)?;
            children.push(child);
            offset += used;
        }
        Ok((Self::new(children), version))
    }
}

fn encode_child(buf: &mut Vec<u8>, child: &ChildRef, version: SchemaVersion) {
    buf.extend_from_slice(child.blob.hash.as_bytes());
    buf.extend_from_slice(child.blob.locator.as_bytes());
    encode_varint(buf, child.kind.tag());
    if version.has_lengths() {
        encode_varint(buf, child.length.unwrap_or_default());
    }
    if version.has_rolling_hashes() && child.is_leaf() {
        buf.extend_from_slice(&child.rolling_hash.unwrap_or_default().to_le_bytes());
    }
}

fn decode_child(data: &[u8], start: usize, version: SchemaVersion) -> NodeResult<(ChildRef, usize)> {
    let mut offset = start;

    let hash = read_id(data, offset)?;
    offset += OBJECT_ID_LEN;
    let locator = read_id(data, offset)?;
    offset += OBJECT_ID_LEN;

    let (tag, used) = decode_varint(data, offset)?;
    let kind = NodeKind::from_tag(tag).ok_or(NodeError::InvalidTypeTag { tag, offset })?;
    offset += used;

    let length = if version.has_lengths() {
        let (length, used) = decode_varint(data, offset)?;
        offset += used;
        Some(length)
    } else {
        None
    };

    let rolling_hash = if version.has_rolling_hashes() && kind == NodeKind::Leaf {
        let raw: [u8; 4] = data
            .get(offset..offset + 4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| truncated(offset, "rolling hash"))?;
        offset += 4;
        Some(u32::from_le_bytes(raw))
    } else {
        None
    };

    let child = ChildRef {
        kind,
        length,
        rolling_hash,
        blob: BlobRef::new(hash, locator),
    };
    Ok((child, offset - start))
}

fn read_id(data: &[u8], offset: usize) -> NodeResult<ObjectId> {
    data.get(offset..offset + OBJECT_ID_LEN)
        .and_then(|s| ObjectId::from_slice(s).ok())
        .ok_or_else(|| truncated(offset, "object id"))
}

fn truncated(offset: usize, what: &str) -> NodeError {
    NodeError::Corrupt {
        offset,
        reason: format!("truncated {what}"),
    }
}
