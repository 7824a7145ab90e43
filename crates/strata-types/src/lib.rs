//! Foundation types for Strata.
//!
//! Strata stores large byte streams and directory trees as content-defined
//! chunks arranged in a Merkle tree. Every other crate in the workspace
//! depends on `strata-types` for the identifier that ties those pieces
//! together.
//!
//! # Key Types
//!
//! - [`ObjectId`]: Content-addressed identifier (BLAKE3 hash)

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::{ObjectId, OBJECT_ID_LEN};
