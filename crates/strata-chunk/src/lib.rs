//! Content-defined chunking and Merkle tree storage for Strata.
//!
//! Writing a stream:
//!
//! 1. [`BoundaryFinder`] picks cut points with a rolling hash, so identical
//!    byte runs produce identical chunks wherever they appear.
//! 2. [`LeafBuilder`] persists each chunk as a leaf blob and hashes the
//!    whole stream as it goes.
//! 3. [`TreeBuilder`] groups leaves into interior nodes, layer by layer,
//!    splitting groups on content so unchanged regions keep their nodes.
//!
//! Reading one back goes through [`LeafEnumerator`] and
//! [`StreamReconstructor`].

pub mod boundary;
pub mod chunker;
pub mod enumerate;
pub mod error;
pub mod import;
pub mod leaf;
pub mod options;
pub mod reconstruct;
pub mod tree;

pub use boundary::{find_boundary, BoundaryFinder, Cut};
pub use chunker::Chunker;
pub use enumerate::LeafEnumerator;
pub use error::{ChunkError, ChunkResult};
pub use import::{DirectoryImporter, ImportSummary};
pub use leaf::{LeafBuilder, LeafOutput};
pub use options::{ChunkingOptions, InteriorOptions, LeafOptions};
pub use reconstruct::{ChunkedDataReader, StreamReconstructor};
pub use tree::TreeBuilder;
