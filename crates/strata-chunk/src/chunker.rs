use std::path::Path;

use bytes::Bytes;
use strata_node::ChunkedData;
use strata_store::BlobStore;
use tokio::io::AsyncRead;

use crate::error::ChunkResult;
use crate::leaf::LeafBuilder;
use crate::options::ChunkingOptions;
use crate::tree::TreeBuilder;

/// Leafs a stream and builds its tree in one step.
pub struct Chunker<'a, S: BlobStore + ?Sized> {
    store: &'a S,
    options: ChunkingOptions,
}

impl<'a, S: BlobStore + ?Sized> Chunker<'a, S> {
    pub fn new(store: &'a S, options: ChunkingOptions) -> ChunkResult<Self> {
        options.validate()?;
        Ok(Self { store, options })
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    pub fn options(&self) -> &ChunkingOptions {
        &self.options
    }

    pub async fn chunk_reader<R>(&self, reader: R) -> ChunkResult<ChunkedData>
    where
        R: AsyncRead + Unpin,
    {
        Ok(self.chunk_counted(reader).await?.0)
    }

    pub async fn chunk_bytes(&self, data: Bytes) -> ChunkResult<ChunkedData> {
        self.chunk_reader(&data[..]).await
    }

    pub async fn chunk_file(&self, path: impl AsRef<Path>) -> ChunkResult<ChunkedData> {
        Ok(self.chunk_file_counted(path).await?.0)
    }

    /// Chunk a file and also return how many bytes were read from it.
    pub(crate) async fn chunk_file_counted(
        &self,
        path: impl AsRef<Path>,
    ) -> ChunkResult<(ChunkedData, u64)> {
        let file = tokio::fs::File::open(path).await?;
        self.chunk_counted(tokio::io::BufReader::new(file)).await
    }

    async fn chunk_counted<R>(&self, reader: R) -> ChunkResult<(ChunkedData, u64)>
    where
        R: AsyncRead + Unpin,
    {
        let leaves = LeafBuilder::new(self.store, &self.options.leaf)?
            .build(reader)
            .await?;
        let root = TreeBuilder::new(self.store, &self.options.interior)?
            .build(leaves.leaves)
            .await?;
        Ok((ChunkedData::new(leaves.digest, root), leaves.length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};
    use strata_node::{read_children, ChildRef, InteriorNode, NodeKind, SchemaVersion};
    use strata_store::InMemoryBlobStore;
    use strata_types::ObjectId;

    use crate::enumerate::LeafEnumerator;
    use crate::options::{InteriorOptions, LeafOptions};
    use crate::reconstruct::StreamReconstructor;

    fn small() -> ChunkingOptions {
        ChunkingOptions {
            leaf: LeafOptions::new(256, 1024, 4096),
            interior: InteriorOptions::default(),
        }
    }

    fn random(len: usize, seed: u64) -> Vec<u8> {
        let mut data = vec![0u8; len];
        StdRng::seed_from_u64(seed).fill_bytes(&mut data);
        data
    }

    async fn roundtrip(store: &Arc<InMemoryBlobStore>, input: &[u8]) -> ChunkedData {
        let chunked = Chunker::new(store.as_ref(), small())
            .unwrap()
            .chunk_bytes(Bytes::copy_from_slice(input))
            .await
            .unwrap();
        let out = StreamReconstructor::new(store.clone())
            .verify(true)
            .read_all(chunked.root)
            .await
            .unwrap();
        assert_eq!(&out[..], input, "round trip of {} bytes", input.len());
        assert_eq!(chunked.digest, ObjectId::from_bytes(input));
        assert_eq!(chunked.length(), Some(input.len() as u64));
        chunked
    }

    /// Check `length == sum(children)` at every interior node.
    async fn assert_lengths_consistent(store: &InMemoryBlobStore, root: ChildRef) {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.kind == NodeKind::Leaf {
                continue;
            }
            let children = read_children(store, &node).await.unwrap();
            let sum: u64 = children.iter().map(|c| c.length.unwrap()).sum();
            assert_eq!(node.length, Some(sum));
            stack.extend(children);
        }
    }

    // -----------------------------------------------------------------------
    // Round trips at the size boundaries
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn roundtrip_edge_lengths() {
        let store = Arc::new(InMemoryBlobStore::new());
        for len in [0, 1, 255, 256, 1024, 4096, 4097, 3 * 1024 * 1024] {
            let chunked = roundtrip(&store, &random(len, len as u64)).await;
            assert_lengths_consistent(&store, chunked.root).await;
        }
    }

    #[tokio::test]
    async fn tiny_stream_is_a_single_leaf() {
        let store = Arc::new(InMemoryBlobStore::new());
        let chunked = roundtrip(&store, b"x").await;
        assert_eq!(chunked.root.kind, NodeKind::Leaf);
    }

    #[tokio::test]
    async fn empty_stream_root_is_empty_interior() {
        let store = Arc::new(InMemoryBlobStore::new());
        let chunked = roundtrip(&store, b"").await;
        assert_eq!(chunked.root.kind, NodeKind::Interior);
        assert!(read_children(store.as_ref(), &chunked.root).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn older_schema_tree_still_reads() {
        let store = Arc::new(InMemoryBlobStore::new());
        let mut options = small();
        options.interior.schema_version = SchemaVersion::Initial;
        let input = random(200_000, 9);
        let chunked = Chunker::new(store.as_ref(), options)
            .unwrap()
            .chunk_bytes(Bytes::from(input.clone()))
            .await
            .unwrap();

        let data = store.read(&chunked.root.locator()).await.unwrap();
        let (_, version) = InteriorNode::decode(&data).unwrap();
        assert_eq!(version, SchemaVersion::Initial);
        assert_eq!(chunked.length(), Some(input.len() as u64));

        let out = StreamReconstructor::new(store).read_all(chunked.root).await.unwrap();
        assert_eq!(&out[..], &input[..]);
    }

    // -----------------------------------------------------------------------
    // Deduplication
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn shared_run_dedups_across_offsets() {
        let store = Arc::new(InMemoryBlobStore::new());
        let shared = random(400_000, 42);

        let mut a = random(1_000, 1);
        a.extend_from_slice(&shared);
        let mut b = random(33_333, 2);
        b.extend_from_slice(&shared);
        b.extend_from_slice(&random(5_000, 3));

        let b_len = b.len() as u64;
        let chunker = Chunker::new(store.as_ref(), small()).unwrap();
        let ca = chunker.chunk_bytes(Bytes::from(a)).await.unwrap();
        let before = store.total_bytes();
        let cb = chunker.chunk_bytes(Bytes::from(b)).await.unwrap();
        // Most of the second stream is already stored.
        assert!(store.total_bytes() - before < b_len / 2);

        let leaves_a = LeafEnumerator::new(store.as_ref(), ca.root).collect().await.unwrap();
        let leaves_b = LeafEnumerator::new(store.as_ref(), cb.root).collect().await.unwrap();
        let hashes_b: std::collections::HashSet<ObjectId> =
            leaves_b.iter().map(|l| l.hash()).collect();
        let shared_count = leaves_a.iter().filter(|l| hashes_b.contains(&l.hash())).count();
        assert!(
            shared_count * 10 >= leaves_a.len() * 8,
            "{shared_count} of {} leaves shared",
            leaves_a.len()
        );
    }

    #[tokio::test]
    async fn identical_input_identical_root() {
        let store = Arc::new(InMemoryBlobStore::new());
        let input = random(100_000, 5);
        let a = roundtrip(&store, &input).await;
        let b = roundtrip(&store, &input).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn chunk_file_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.bin");
        let input = random(70_000, 8);
        std::fs::write(&path, &input).unwrap();

        let store = InMemoryBlobStore::new();
        let chunker = Chunker::new(&store, small()).unwrap();
        let from_file = chunker.chunk_file(&path).await.unwrap();
        let from_bytes = chunker.chunk_bytes(Bytes::from(input)).await.unwrap();
        assert_eq!(from_file, from_bytes);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn any_input_roundtrips(input in prop::collection::vec(any::<u8>(), 0..20_000)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = Arc::new(InMemoryBlobStore::new());
                roundtrip(&store, &input).await;
            });
        }
    }
}
