//! Reading and writing nodes through a [`BlobStore`].

use bytes::Bytes;
use strata_store::BlobStore;
use strata_types::ObjectId;
use tracing::trace;

use crate::error::{NodeError, NodeResult};
use crate::node::{BlobRef, ChildRef, InteriorNode, Node, NodeKind};
use crate::schema::SchemaVersion;

/// Persist raw chunk bytes as a leaf.
pub async fn write_leaf<S>(store: &S, data: Bytes, rolling_hash: u32) -> NodeResult<ChildRef>
where
    S: BlobStore + ?Sized,
{
    let hash = ObjectId::from_bytes(&data);
    let length = data.len() as u64;
    let locator = store.put(data).await?;
    Ok(ChildRef::leaf(BlobRef::new(hash, locator), length, rolling_hash))
}

/// Encode `node` at `version` and persist it.
pub async fn write_interior<S>(
    store: &S,
    node: &InteriorNode,
    version: SchemaVersion,
) -> NodeResult<ChildRef>
where
    S: BlobStore + ?Sized,
{
    let encoded = node.encode(version)?;
    let hash = ObjectId::from_bytes(&encoded);
    let locator = store.put(encoded).await?;
    trace!(%hash, children = node.len(), "wrote interior node");
    Ok(ChildRef {
        kind: NodeKind::Interior,
        length: node.length(),
        rolling_hash: None,
        blob: BlobRef::new(hash, locator),
    })
}

/// Fetch and decode the node `child` points at.
///
/// A leaf whose size disagrees with a recorded length is rejected.
pub async fn read_node<S>(store: &S, child: &ChildRef) -> NodeResult<Node>
where
    S: BlobStore + ?Sized,
{
    let data = store.read(&child.locator()).await?;
    if child.is_leaf() {
        check_leaf_length(child, data.len() as u64)?;
    }
    let (node, _) = Node::decode(child.kind, data)?;
    Ok(node)
}

/// Fetch the children of an interior node.
pub async fn read_children<S>(store: &S, child: &ChildRef) -> NodeResult<Vec<ChildRef>>
where
    S: BlobStore + ?Sized,
{
    let data = store.read(&child.locator()).await?;
    let (node, _) = InteriorNode::decode(&data)?;
    Ok(node.into_children())
}

/// Fail if a fetched leaf's size disagrees with its recorded length.
pub fn check_leaf_length(child: &ChildRef, actual: u64) -> NodeResult<()> {
    match child.length {
        Some(expected) if expected != actual => Err(NodeError::LengthMismatch {
            locator: child.locator(),
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_store::InMemoryBlobStore;

    #[tokio::test]
    async fn leaf_write_and_read() {
        let store = InMemoryBlobStore::new();
        let child = write_leaf(&store, Bytes::from_static(b"chunk"), 42).await.unwrap();
        assert_eq!(child.length, Some(5));
        assert_eq!(child.rolling_hash, Some(42));
        assert_eq!(child.hash(), ObjectId::from_bytes(b"chunk"));
        assert_ne!(child.hash(), child.locator());

        match read_node(&store, &child).await.unwrap() {
            Node::Leaf(leaf) => assert_eq!(&leaf.data[..], b"chunk"),
            other => panic!("expected leaf, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn interior_write_and_read() {
        let store = InMemoryBlobStore::new();
        let a = write_leaf(&store, Bytes::from_static(b"aa"), 1).await.unwrap();
        let b = write_leaf(&store, Bytes::from_static(b"bbb"), 2).await.unwrap();
        let node = InteriorNode::new(vec![a, b]);

        let parent = write_interior(&store, &node, SchemaVersion::LATEST).await.unwrap();
        assert_eq!(parent.kind, NodeKind::Interior);
        assert_eq!(parent.length, Some(5));

        assert_eq!(read_children(&store, &parent).await.unwrap(), vec![a, b]);
        assert_eq!(read_node(&store, &parent).await.unwrap(), Node::Interior(node));
    }

    #[tokio::test]
    async fn leaf_length_mismatch_is_rejected() {
        let store = InMemoryBlobStore::new();
        let mut child = write_leaf(&store, Bytes::from_static(b"abc"), 0).await.unwrap();
        child.length = Some(10);
        let err = read_node(&store, &child).await.unwrap_err();
        assert!(matches!(err, NodeError::LengthMismatch { expected: 10, actual: 3, .. }));
    }

    #[tokio::test]
    async fn missing_blob_surfaces_store_error() {
        let store = InMemoryBlobStore::new();
        let ghost = ChildRef::leaf(
            BlobRef::new(ObjectId::from_bytes(b"x"), ObjectId::from_bytes(b"y")),
            1,
            0,
        );
        let err = read_node(&store, &ghost).await.unwrap_err();
        assert!(!err.is_format_error());
    }
}
