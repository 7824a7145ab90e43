//! # strata-extract
//!
//! Materializes stored directory trees onto the local filesystem.
//!
//! Extraction runs as a staged pipeline (see [`pipeline`]): one task walks
//! the directory tree and expands each file into chunk requests, reader
//! tasks fetch chunks from the blob store, and writer tasks place them at
//! their offsets in the output files. A file is finalized (mode bits,
//! optional digest check) when its last chunk lands.
//!
//! ```no_run
//! # async fn demo(store: std::sync::Arc<dyn strata_store::BlobStore>, root: strata_node::BlobRef)
//! # -> strata_extract::ExtractResult<()> {
//! use strata_extract::{ExtractOptions, ExtractionPipeline};
//! use tokio_util::sync::CancellationToken;
//!
//! let pipeline = ExtractionPipeline::new(store, ExtractOptions::default())?;
//! let stats = pipeline
//!     .extract_directory(&root, "out", CancellationToken::new())
//!     .await?;
//! println!("{} files", stats.files_written);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod options;
pub mod output;
pub mod pipeline;
pub mod stats;

pub use error::{ExtractError, ExtractResult};
pub use options::ExtractOptions;
pub use output::{ChunkReadRequest, ChunkWriteRequest, FileStage, OutputFile};
pub use pipeline::ExtractionPipeline;
pub use stats::{
    ExtractCounters, ExtractProgress, ExtractProgressSink, ExtractStats, LoggingProgressSink,
    RateWindow,
};
