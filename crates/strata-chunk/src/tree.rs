use std::collections::HashMap;
use std::ops::Range;

use strata_node::{write_interior, ChildRef, InteriorNode, NodeError, NodeKind};
use strata_store::{BlobStore, InMemoryBlobStore};
use strata_types::ObjectId;
use tracing::debug;

use crate::error::ChunkResult;
use crate::options::InteriorOptions;

/// Key compared against the slice threshold when grouping.
///
/// Leaves use the rolling hash at their cut; interior nodes use the low
/// bits of their content hash.
pub fn split_key(child: &ChildRef) -> u32 {
    match (child.kind, child.rolling_hash) {
        (NodeKind::Leaf, Some(rolling)) => rolling,
        _ => child.hash().low_u32(),
    }
}

/// Partition one layer of children into groups.
///
/// A group takes at least `min_child_count` children, then closes after the
/// first child whose [`split_key`] is below the threshold, or at
/// `max_child_count`. The trailing group may be short.
pub fn group_layer(children: &[ChildRef], options: &InteriorOptions) -> Vec<Range<usize>> {
    let threshold = options.slice_threshold();
    let mut groups = Vec::new();
    let mut start = 0;
    for (i, child) in children.iter().enumerate() {
        let size = i + 1 - start;
        if size >= options.max_child_count
            || (size >= options.min_child_count && split_key(child) < threshold)
        {
            groups.push(start..i + 1);
            start = i + 1;
        }
    }
    if start < children.len() {
        groups.push(start..children.len());
    }
    groups
}

/// Builds a Merkle tree of interior nodes over a flat list of leaves.
pub struct TreeBuilder<'a, S: BlobStore + ?Sized> {
    store: &'a S,
    options: InteriorOptions,
}

struct Frame {
    pending: Vec<ChildRef>,
    next: usize,
    done: Vec<ChildRef>,
}

impl<'a, S: BlobStore + ?Sized> TreeBuilder<'a, S> {
    pub fn new(store: &'a S, options: &InteriorOptions) -> ChunkResult<Self> {
        options.validate()?;
        Ok(Self {
            store,
            options: *options,
        })
    }

    /// Build the tree and return its root.
    ///
    /// Layers are assembled in a scratch store, then the finished tree is
    /// written to the durable store children-first, left to right. The
    /// children of every scratch node are kept in memory for that pass, so
    /// lengths survive even when the schema does not store them.
    pub async fn build(&self, leaves: Vec<ChildRef>) -> ChunkResult<ChildRef> {
        let version = self.options.schema_version;
        if leaves.is_empty() {
            return Ok(write_interior(self.store, &InteriorNode::default(), version).await?);
        }

        let scratch = InMemoryBlobStore::new();
        let mut built = ScratchNodes::new();
        let mut layer = leaves;
        let mut depth = 0;
        while layer.len() > 1 {
            let mut next = Vec::new();
            for range in group_layer(&layer, &self.options) {
                let node = InteriorNode::new(layer[range].to_vec());
                let child = write_interior(&scratch, &node, version).await?;
                built.insert(child.locator(), node.into_children());
                next.push(child);
            }
            depth += 1;
            debug!(depth, nodes = next.len(), "built tree layer");
            layer = next;
        }

        let root = layer[0];
        if root.is_leaf() {
            return Ok(root);
        }
        self.finalize(&built, root).await
    }

    /// Re-persist a scratch tree through the durable store in postorder.
    async fn finalize(&self, built: &ScratchNodes, root: ChildRef) -> ChunkResult<ChildRef> {
        let version = self.options.schema_version;
        let mut stack = vec![Frame::load(built, &root)?];
        let mut written = 0usize;

        while let Some(frame) = stack.last_mut() {
            if let Some(child) = frame.pending.get(frame.next).copied() {
                frame.next += 1;
                if child.is_leaf() {
                    frame.done.push(child);
                } else {
                    stack.push(Frame::load(built, &child)?);
                }
                continue;
            }

            let Some(frame) = stack.pop() else { break };
            let node = write_interior(self.store, &InteriorNode::new(frame.done), version).await?;
            written += 1;
            match stack.last_mut() {
                Some(parent) => parent.done.push(node),
                None => {
                    debug!(interior_nodes = written, root = %node.hash(), "finalized tree");
                    return Ok(node);
                }
            }
        }
        Ok(root)
    }
}

/// Children of each scratch node, keyed by scratch locator.
type ScratchNodes = HashMap<ObjectId, Vec<ChildRef>>;

impl Frame {
    fn load(built: &ScratchNodes, node: &ChildRef) -> ChunkResult<Self> {
        let pending = built.get(&node.locator()).cloned().ok_or_else(|| NodeError::Corrupt {
            offset: 0,
            reason: format!("scratch node {} was never built", node.locator()),
        })?;
        Ok(Self {
            done: Vec::with_capacity(pending.len()),
            pending,
            next: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_node::{read_children, read_node, BlobRef, Node, SchemaVersion};
    use strata_types::ObjectId;

    fn leaf(i: u32, rolling: u32) -> ChildRef {
        let id = ObjectId::from_bytes(&i.to_le_bytes());
        ChildRef::leaf(BlobRef::new(id, id), 10, rolling)
    }

    fn opts(min: usize, target: usize, max: usize) -> InteriorOptions {
        InteriorOptions::new(min, target, max)
    }

    // -----------------------------------------------------------------------
    // Grouping
    // -----------------------------------------------------------------------

    #[test]
    fn groups_respect_min_and_max() {
        // Every child qualifies as a split point.
        let children: Vec<ChildRef> = (0..20).map(|i| leaf(i, 0)).collect();
        let groups = group_layer(&children, &opts(3, 4, 5));
        assert!(groups[..groups.len() - 1].iter().all(|g| g.len() == 3));

        // No child qualifies; only max closes groups.
        let children: Vec<ChildRef> = (0..20).map(|i| leaf(i, u32::MAX)).collect();
        let groups = group_layer(&children, &opts(3, 4, 5));
        assert_eq!(groups, vec![0..5, 5..10, 10..15, 15..20]);
    }

    #[test]
    fn groups_cover_layer_in_order() {
        let children: Vec<ChildRef> = (0..103).map(|i| leaf(i, i.wrapping_mul(0x9E37_79B9))).collect();
        let groups = group_layer(&children, &InteriorOptions::default());
        let mut expected = 0;
        for g in &groups {
            assert_eq!(g.start, expected);
            expected = g.end;
        }
        assert_eq!(expected, 103);
    }

    #[test]
    fn grouping_is_content_defined() {
        // The same run of children groups the same way after a prefix,
        // once both sides have passed a split point.
        let run: Vec<ChildRef> = (0..200).map(|i| leaf(i, i.wrapping_mul(0x9E37_79B9))).collect();
        let mut prefixed: Vec<ChildRef> = (1000..1003).map(|i| leaf(i, u32::MAX)).collect();
        prefixed.extend_from_slice(&run);

        let ends = |groups: Vec<Range<usize>>, skip: usize| -> Vec<usize> {
            groups.into_iter().map(|g| g.end - skip).filter(|&e| e > 80).collect()
        };
        let opts = InteriorOptions::default();
        let tail_a = ends(group_layer(&run, &opts), 0);
        let tail_b = ends(group_layer(&prefixed, &opts), 3);
        assert!(!tail_a.is_empty());
        assert_eq!(tail_a, tail_b);
    }

    #[test]
    fn interior_split_key_uses_hash() {
        let id = ObjectId::from_bytes(b"node");
        let child = ChildRef::interior(BlobRef::new(id, id), 1);
        assert_eq!(split_key(&child), id.low_u32());
        assert_eq!(split_key(&leaf(1, 77)), 77);
    }

    // -----------------------------------------------------------------------
    // Building
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn empty_input_gives_empty_interior_root() {
        let store = InMemoryBlobStore::new();
        let root = TreeBuilder::new(&store, &InteriorOptions::default())
            .unwrap()
            .build(vec![])
            .await
            .unwrap();
        assert_eq!(root.kind, NodeKind::Interior);
        assert_eq!(root.length, Some(0));
        assert_eq!(read_node(&store, &root).await.unwrap(), Node::Interior(InteriorNode::default()));
    }

    #[tokio::test]
    async fn single_leaf_is_its_own_root() {
        let store = InMemoryBlobStore::new();
        let only = leaf(1, 5);
        let root = TreeBuilder::new(&store, &InteriorOptions::default())
            .unwrap()
            .build(vec![only])
            .await
            .unwrap();
        assert_eq!(root, only);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn durable_writes_are_postorder() {
        let store = InMemoryBlobStore::new();
        let leaves: Vec<ChildRef> = (0..40).map(|i| leaf(i, u32::MAX)).collect();
        let root = TreeBuilder::new(&store, &opts(2, 4, 4))
            .unwrap()
            .build(leaves)
            .await
            .unwrap();
        assert_eq!(root.length, Some(400));

        // Expected order: walk the durable tree children-first.
        let mut expected = Vec::new();
        let mut stack = vec![(root, false)];
        while let Some((node, visited)) = stack.pop() {
            if node.is_leaf() {
                continue;
            }
            if visited {
                expected.push(node.locator());
                continue;
            }
            stack.push((node, true));
            for child in read_children(&store, &node).await.unwrap().into_iter().rev() {
                stack.push((child, false));
            }
        }
        assert_eq!(store.put_log(), expected);
        // Ten nodes over the leaves, at least three above them, one root.
        assert!(expected.len() >= 14);
    }

    #[tokio::test]
    async fn initial_schema_root_keeps_length() {
        let store = InMemoryBlobStore::new();
        let leaves: Vec<ChildRef> = (0..40).map(|i| leaf(i, u32::MAX)).collect();
        let mut options = opts(2, 4, 4);
        options.schema_version = SchemaVersion::Initial;
        let root = TreeBuilder::new(&store, &options).unwrap().build(leaves).await.unwrap();
        assert_eq!(root.kind, NodeKind::Interior);
        assert_eq!(root.length, Some(400));

        // Stored children carry no lengths at this schema.
        let stored = read_children(&store, &root).await.unwrap();
        assert!(stored.iter().all(|c| c.length.is_none()));
    }
}
