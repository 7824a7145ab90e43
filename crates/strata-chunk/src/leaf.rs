use bytes::{Bytes, BytesMut};
use strata_crypto::StreamHasher;
use strata_node::{write_leaf, ChildRef};
use strata_store::BlobStore;
use strata_types::ObjectId;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::boundary::BoundaryFinder;
use crate::error::ChunkResult;
use crate::options::LeafOptions;

/// Bytes processed between progress callbacks.
pub const PROGRESS_INTERVAL: u64 = 512 * 1024;

/// Callback receiving the running count of bytes leafed.
pub type LeafProgress = Box<dyn FnMut(u64) + Send>;

/// Result of splitting a stream into leaves.
#[derive(Clone, Debug)]
pub struct LeafOutput {
    /// Leaf references in stream order.
    pub leaves: Vec<ChildRef>,
    /// BLAKE3 of the whole stream.
    pub digest: ObjectId,
    pub length: u64,
}

/// Splits a byte stream into content-defined leaves and persists them.
pub struct LeafBuilder<'a, S: BlobStore + ?Sized> {
    store: &'a S,
    finder: BoundaryFinder,
    progress: Option<LeafProgress>,
}

impl<'a, S: BlobStore + ?Sized> LeafBuilder<'a, S> {
    pub fn new(store: &'a S, options: &LeafOptions) -> ChunkResult<Self> {
        options.validate()?;
        Ok(Self {
            store,
            finder: BoundaryFinder::new(options),
            progress: None,
        })
    }

    /// Report bytes processed roughly every [`PROGRESS_INTERVAL`] bytes.
    pub fn on_progress(mut self, callback: impl FnMut(u64) + Send + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Read `reader` to the end, writing one blob per chunk.
    pub async fn build<R>(&mut self, mut reader: R) -> ChunkResult<LeafOutput>
    where
        R: AsyncRead + Unpin,
    {
        let max = self.finder.max_size();
        let mut buf = BytesMut::with_capacity(max * 2);
        let mut hasher = StreamHasher::new();
        let mut leaves = Vec::new();
        let mut eof = false;
        let mut last_report = 0u64;

        loop {
            while !eof && buf.len() < max {
                buf.reserve(max - buf.len());
                if reader.read_buf(&mut buf).await? == 0 {
                    eof = true;
                }
            }
            let Some(cut) = self.finder.find(&buf, eof) else {
                break;
            };

            let chunk = buf.split_to(cut.length).freeze();
            hasher.update(&chunk);
            leaves.push(write_leaf(self.store, chunk, cut.rolling_hash).await?);

            if let Some(progress) = self.progress.as_mut() {
                if hasher.length() - last_report >= PROGRESS_INTERVAL {
                    last_report = hasher.length();
                    progress(last_report);
                }
            }
        }

        if let Some(progress) = self.progress.as_mut() {
            if hasher.length() != last_report {
                progress(hasher.length());
            }
        }

        let digest = hasher.digest();
        debug!(leaves = leaves.len(), length = hasher.length(), %digest, "leafed stream");
        Ok(LeafOutput {
            leaves,
            digest,
            length: hasher.length(),
        })
    }

    /// Leaf an in-memory buffer.
    pub async fn build_from_bytes(&mut self, data: Bytes) -> ChunkResult<LeafOutput> {
        self.build(&data[..]).await
    }
}
