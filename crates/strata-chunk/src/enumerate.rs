use strata_node::{read_children, ChildRef};
use strata_store::BlobStore;

use crate::error::ChunkResult;

/// Lazily flattens a chunk tree into its leaves, left to right.
///
/// Traversal uses an explicit stack, so tree depth never grows the call
/// stack. Leaves from nodes that predate stored lengths come back with
/// their length filled in from the blob itself.
pub struct LeafEnumerator<'a, S: BlobStore + ?Sized> {
    store: &'a S,
    stack: Vec<ChildRef>,
}

impl<'a, S: BlobStore + ?Sized> LeafEnumerator<'a, S> {
    pub fn new(store: &'a S, root: ChildRef) -> Self {
        Self {
            store,
            stack: vec![root],
        }
    }

    /// The next leaf, or `None` once the tree is exhausted.
    pub async fn next(&mut self) -> ChunkResult<Option<ChildRef>> {
        while let Some(node) = self.stack.pop() {
            if node.is_leaf() {
                return Ok(Some(self.with_length(node).await?));
            }
            let children = read_children(self.store, &node).await?;
            self.stack.extend(children.into_iter().rev());
        }
        Ok(None)
    }

    /// Drain the remaining leaves into a vector.
    pub async fn collect(mut self) -> ChunkResult<Vec<ChildRef>> {
        let mut leaves = Vec::new();
        while let Some(leaf) = self.next().await? {
            leaves.push(leaf);
        }
        Ok(leaves)
    }

    async fn with_length(&self, mut leaf: ChildRef) -> ChunkResult<ChildRef> {
        if leaf.length.is_none() {
            let data = self.store.read(&leaf.locator()).await?;
            leaf.length = Some(data.len() as u64);
        }
        Ok(leaf)
    }
}
