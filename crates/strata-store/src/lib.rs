//! Content-addressed blob storage for Strata.
//!
//! The chunking layer treats the store as an external key-value service:
//! `put(bytes) -> locator` and `get(locator) -> bytes`. Leaf chunks, interior
//! nodes and directory listings all land here as opaque, immutable blobs.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`InMemoryBlobStore`]: `HashMap`-based store for tests, scratch space
//!   and embedding
//! - [`FileBlobStore`]: one file per blob under a fan-out directory
//! - [`SlowBlobStore`]: latency-injecting wrapper for tests
//!
//! # Design Rules
//!
//! 1. Blobs are immutable once written (content-addressing guarantees this).
//! 2. Concurrent reads are always safe.
//! 3. The store never interprets blob contents.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod slow;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use file::FileBlobStore;
pub use memory::InMemoryBlobStore;
pub use slow::SlowBlobStore;
pub use traits::BlobStore;
