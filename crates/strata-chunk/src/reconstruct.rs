use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use strata_node::{check_leaf_length, ChildRef};
use strata_store::BlobStore;
use strata_types::ObjectId;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::enumerate::LeafEnumerator;
use crate::error::{ChunkError, ChunkResult};

/// Leaves buffered between the replay task and a [`ChunkedDataReader`].
pub const PIPE_DEPTH: usize = 4;

/// Pull-style reader over a chunk tree, fed by a background task.
pub type ChunkedDataReader = StreamReader<ReceiverStream<std::io::Result<Bytes>>, Bytes>;

/// Replays a chunk tree back into the original byte stream.
#[derive(Clone)]
pub struct StreamReconstructor {
    store: Arc<dyn BlobStore>,
    verify: bool,
}

impl StreamReconstructor {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            verify: false,
        }
    }

    /// Check every leaf against its recorded hash while reading.
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Write the bytes under `root` to `out`, returning the count written.
    pub async fn copy_to<W>(&self, root: ChildRef, out: &mut W) -> ChunkResult<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut leaves = LeafEnumerator::new(&*self.store, root);
        let mut written = 0u64;
        while let Some(leaf) = leaves.next().await? {
            let data = self.read_leaf(&leaf).await?;
            out.write_all(&data).await?;
            written += data.len() as u64;
        }
        out.flush().await?;
        debug!(root = %root.hash(), written, "reconstructed stream");
        Ok(written)
    }

    /// Materialize the whole stream in memory.
    pub async fn read_all(&self, root: ChildRef) -> ChunkResult<Bytes> {
        let mut buf = BytesMut::with_capacity(root.length.unwrap_or_default() as usize);
        let mut leaves = LeafEnumerator::new(&*self.store, root);
        while let Some(leaf) = leaves.next().await? {
            buf.extend_from_slice(&self.read_leaf(&leaf).await?);
        }
        Ok(buf.freeze())
    }

    /// Open the stream as an `AsyncRead`.
    ///
    /// A spawned task walks the tree and pushes leaves through a channel of
    /// [`PIPE_DEPTH`] entries, so only a few leaves are held at once. Errors
    /// surface as I/O errors on the reader. Dropping the reader stops the
    /// task.
    pub fn reader(&self, root: ChildRef) -> ChunkedDataReader {
        let (tx, rx) = mpsc::channel(PIPE_DEPTH);
        let this = self.clone();
        tokio::spawn(async move {
            let mut leaves = LeafEnumerator::new(&*this.store, root);
            loop {
                let item = match leaves.next().await {
                    Ok(Some(leaf)) => this.read_leaf(&leaf).await,
                    Ok(None) => break,
                    Err(e) => Err(e),
                };
                let failed = item.is_err();
                if tx.send(item.map_err(std::io::Error::other)).await.is_err() || failed {
                    break;
                }
            }
        });
        StreamReader::new(ReceiverStream::new(rx))
    }

    async fn read_leaf(&self, leaf: &ChildRef) -> ChunkResult<Bytes> {
        let data = self.store.read(&leaf.locator()).await?;
        check_leaf_length(leaf, data.len() as u64)?;
        if self.verify {
            let actual = ObjectId::from_bytes(&data);
            if actual != leaf.hash() {
                return Err(ChunkError::HashMismatch {
                    locator: leaf.locator(),
                    expected: leaf.hash(),
                    actual,
                });
            }
        }
        Ok(data)
    }
}
