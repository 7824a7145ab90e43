//! Staged extraction of directory trees.
//!
//! ```text
//! enumerator ──► readers (N) ──► decoders (M) ──► writers (K)
//!      │              │                               │
//!      └──────────────┴── ExtractCounters ◄───────────┘──► stats
//! ```
//!
//! Stages talk only through bounded `flume` channels. Every stage selects
//! on one shared [`CancellationToken`] at each suspension point, and the
//! first failure anywhere cancels the rest.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use strata_chunk::LeafEnumerator;
use strata_node::{check_leaf_length, BlobRef, DirectoryNode, FileEntry, NodeError};
use strata_store::BlobStore;
use strata_types::ObjectId;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ExtractError, ExtractResult};
use crate::options::ExtractOptions;
use crate::output::{ChunkReadRequest, ChunkWriteRequest, OutputFile};
use crate::stats::{run_stats, ExtractCounters, ExtractStats};

/// Queue slots per consuming task.
pub const QUEUE_DEPTH_PER_TASK: usize = 16;

/// What the enumerator walks.
#[derive(Clone, Debug)]
enum Source {
    Directory(BlobRef, PathBuf),
    File(FileEntry, PathBuf),
}

/// Extracts stored directory trees and files onto the local filesystem.
pub struct ExtractionPipeline {
    store: Arc<dyn BlobStore>,
    options: ExtractOptions,
}

impl ExtractionPipeline {
    pub fn new(store: Arc<dyn BlobStore>, options: ExtractOptions) -> ExtractResult<Self> {
        options.validate()?;
        Ok(Self { store, options })
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Write the directory tree under `root` into `out_dir`.
    ///
    /// Existing files at the same paths are overwritten. On error the
    /// directory may hold a partial tree.
    pub async fn extract_directory(
        &self,
        root: &BlobRef,
        out_dir: impl AsRef<Path>,
        cancel: CancellationToken,
    ) -> ExtractResult<ExtractStats> {
        let source = Source::Directory(*root, out_dir.as_ref().to_path_buf());
        self.run(source, cancel).await
    }

    /// Write a single file to `path`, creating its parent directory.
    pub async fn extract_file(
        &self,
        entry: &FileEntry,
        path: impl AsRef<Path>,
        cancel: CancellationToken,
    ) -> ExtractResult<ExtractStats> {
        let source = Source::File(entry.clone(), path.as_ref().to_path_buf());
        self.run(source, cancel).await
    }

    async fn run(&self, source: Source, cancel: CancellationToken) -> ExtractResult<ExtractStats> {
        let started = Instant::now();
        let opts = &self.options;
        let token = cancel.child_token();
        let counters = Arc::new(ExtractCounters::default());

        let stats_token = CancellationToken::new();
        let stats_task = opts.progress_sink.clone().map(|sink| {
            tokio::spawn(run_stats(
                counters.clone(),
                sink,
                opts.progress_update_frequency(),
                stats_token.clone(),
            ))
        });

        info!(
            readers = opts.num_read_tasks,
            decoders = opts.num_decode_tasks,
            writers = opts.num_write_tasks,
            verify = opts.verify_output,
            "starting extraction"
        );

        let (read_tx, read_rx) = flume::bounded(opts.num_read_tasks * QUEUE_DEPTH_PER_TASK);
        let (decode_tx, decode_rx) = flume::bounded(opts.num_decode_tasks * QUEUE_DEPTH_PER_TASK);
        let (write_tx, write_rx) = flume::bounded(opts.num_write_tasks * QUEUE_DEPTH_PER_TASK);

        let mut tasks: JoinSet<ExtractResult<()>> = JoinSet::new();
        let stage = StageContext {
            store: self.store.clone(),
            counters: counters.clone(),
            token: token.clone(),
            verify: opts.verify_output,
            verbose: opts.verbose_output,
        };

        tasks.spawn(stage.clone().enumerate(source, read_tx));
        for _ in 0..opts.num_read_tasks {
            tasks.spawn(stage.clone().read(read_rx.clone(), decode_tx.clone()));
        }
        for _ in 0..opts.num_decode_tasks {
            tasks.spawn(stage.clone().decode(decode_rx.clone(), write_tx.clone()));
        }
        for _ in 0..opts.num_write_tasks {
            tasks.spawn(stage.clone().write(write_rx.clone()));
        }
        // Channels close once every stage holding an end has finished.
        drop((read_rx, decode_tx, decode_rx, write_tx, write_rx));

        let mut failure: Option<ExtractError> = None;
        while let Some(joined) = tasks.join_next().await {
            let result = joined
                .map_err(|e| ExtractError::TaskFailed(e.to_string()))
                .and_then(|r| r);
            if let Err(e) = result {
                token.cancel();
                let replace = match &failure {
                    None => true,
                    Some(first) => first.is_cancelled() && !e.is_cancelled(),
                };
                if replace {
                    failure = Some(e);
                }
            }
        }

        stats_token.cancel();
        if let Some(task) = stats_task {
            task.await.map_err(|e| ExtractError::TaskFailed(e.to_string()))?;
        }

        let stats = ExtractStats::from_counters(&counters, started.elapsed());
        match failure {
            Some(e) if e.is_cancelled() => {
                warn!(files = stats.files_written, "extraction cancelled");
                Err(e)
            }
            Some(e) => {
                warn!(error = %e, files = stats.files_written, "extraction failed");
                Err(e)
            }
            None => {
                info!(
                    files = stats.files_written,
                    bytes = stats.extracted_bytes,
                    elapsed_ms = stats.elapsed.as_millis() as u64,
                    "extraction finished"
                );
                Ok(stats)
            }
        }
    }
}

/// State every stage task gets a copy of.
#[derive(Clone)]
struct StageContext {
    store: Arc<dyn BlobStore>,
    counters: Arc<ExtractCounters>,
    token: CancellationToken,
    verify: bool,
    verbose: bool,
}

impl StageContext {
    /// Walk the source depth first and queue every chunk of every file.
    async fn enumerate(
        self,
        source: Source,
        tx: flume::Sender<ChunkReadRequest>,
    ) -> ExtractResult<()> {
        if self.token.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }
        match source {
            Source::File(entry, path) => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                self.emit_file(&entry, path, &tx).await
            }
            Source::Directory(root, out_dir) => {
                let mut stack = vec![(root, out_dir)];
                while let Some((node, dir)) = stack.pop() {
                    tokio::fs::create_dir_all(&dir).await?;
                    let listing = self
                        .cancellable(DirectoryNode::read(self.store.as_ref(), &node))
                        .await??;
                    for file in &listing.files {
                        self.emit_file(file, dir.join(&file.name), &tx).await?;
                    }
                    for sub in listing.directories.iter().rev() {
                        stack.push((sub.node, dir.join(&sub.name)));
                    }
                }
                Ok(())
            }
        }
    }

    /// Stream the leaves of one file into the read queue.
    ///
    /// The file holds one extra count until its last leaf is queued, so
    /// writers cannot finalize it early. Whoever drops the count to zero
    /// finalizes it, which may be this task.
    async fn emit_file(
        &self,
        entry: &FileEntry,
        path: PathBuf,
        tx: &flume::Sender<ChunkReadRequest>,
    ) -> ExtractResult<()> {
        let file = Arc::new(OutputFile::new(path, entry));
        let mut leaves = LeafEnumerator::new(self.store.as_ref(), entry.data);
        let mut offset = 0u64;
        let mut chunks = 0usize;

        while let Some(leaf) = self.cancellable(leaves.next()).await?? {
            let length = leaf.length.unwrap_or_default();
            if offset + length > entry.length {
                return Err(NodeError::FileLengthMismatch {
                    expected: entry.length,
                    actual: offset + length,
                }
                .into());
            }
            file.add_chunk();
            let request = ChunkReadRequest {
                file: file.clone(),
                offset,
                leaf,
            };
            self.send(tx, request).await?;
            offset += length;
            chunks += 1;
        }

        if offset != entry.length {
            return Err(NodeError::FileLengthMismatch {
                expected: entry.length,
                actual: offset,
            }
            .into());
        }
        debug!(path = %file.path().display(), chunks, "queued file");

        if chunks == 0 {
            file.create_empty().await?;
        }
        if file.seal() {
            file.finalize(self.verify, self.verbose).await?;
            self.counters.add_file();
        }
        Ok(())
    }

    /// Fetch chunks from the store.
    async fn read(
        self,
        rx: flume::Receiver<ChunkReadRequest>,
        tx: flume::Sender<ChunkWriteRequest>,
    ) -> ExtractResult<()> {
        while let Some(req) = self.recv(&rx).await? {
            let data = self.cancellable(self.store.read(&req.leaf.locator())).await??;
            check_leaf_length(&req.leaf, data.len() as u64)?;
            if self.verify {
                let actual = ObjectId::from_bytes(&data);
                if actual != req.leaf.hash() {
                    return Err(ExtractError::HashMismatch {
                        path: req.file.path().to_path_buf(),
                        offset: req.offset,
                        expected: req.leaf.hash(),
                        actual,
                    });
                }
            }
            self.counters.add_downloaded(data.len() as u64);
            let write = ChunkWriteRequest {
                file: req.file,
                offset: req.offset,
                data,
            };
            self.send(&tx, write).await?;
        }
        Ok(())
    }

    /// Pass-through between fetching and writing.
    async fn decode(
        self,
        rx: flume::Receiver<ChunkWriteRequest>,
        tx: flume::Sender<ChunkWriteRequest>,
    ) -> ExtractResult<()> {
        while let Some(req) = self.recv(&rx).await? {
            self.send(&tx, req).await?;
        }
        Ok(())
    }

    /// Place chunks into their files and finalize completed ones.
    async fn write(self, rx: flume::Receiver<ChunkWriteRequest>) -> ExtractResult<()> {
        while let Some(req) = self.recv(&rx).await? {
            let len = req.data.len() as u64;
            req.file.write_at(req.offset, req.data).await?;
            self.counters.add_extracted(len);
            if req.file.complete_chunk() {
                req.file.finalize(self.verify, self.verbose).await?;
                self.counters.add_file();
            }
        }
        Ok(())
    }

    /// Next item, or `None` once every sender is gone.
    async fn recv<T>(&self, rx: &flume::Receiver<T>) -> ExtractResult<Option<T>> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ExtractError::Cancelled),
            item = rx.recv_async() => Ok(item.ok()),
        }
    }

    async fn send<T>(&self, tx: &flume::Sender<T>, item: T) -> ExtractResult<()> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ExtractError::Cancelled),
            // Receivers only vanish when a downstream stage has failed.
            sent = tx.send_async(item) => sent.map_err(|_| ExtractError::Cancelled),
        }
    }

    async fn cancellable<F: std::future::Future>(&self, fut: F) -> ExtractResult<F::Output> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ExtractError::Cancelled),
            out = fut => Ok(out),
        }
    }
}
