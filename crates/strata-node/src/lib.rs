//! Node model and wire format for Strata chunk trees.
//!
//! A chunked stream is a Merkle tree. Leaves are raw chunk bytes stored as
//! blobs with no header. Interior nodes hold an ordered list of
//! [`ChildRef`]s, serialized under an explicit [`SchemaVersion`] so older
//! data stays readable as fields are added.
//!
//! # Layout
//!
//! - [`node`]: the `{Leaf, Interior}` union and the references between nodes
//! - [`schema`]: type GUIDs and schema revisions
//! - [`codec`]: interior node encoding
//! - [`directory`]: directory listings that point at chunk trees
//! - [`io`]: store-backed read/write helpers

pub mod codec;
pub mod directory;
pub mod error;
pub mod io;
pub mod node;
pub mod schema;
pub mod varint;

pub use directory::{check_entry_name, DirectoryEntry, DirectoryNode, FileEntry, FileFlags};
pub use error::{NodeError, NodeResult};
pub use io::{check_leaf_length, read_children, read_node, write_interior, write_leaf};
pub use node::{BlobRef, ChildRef, ChunkedData, InteriorNode, LeafChunk, Node, NodeKind};
pub use schema::{NodeType, SchemaVersion};
