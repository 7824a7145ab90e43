//! Hashing primitives for Strata.
//!
//! Provides domain-separated BLAKE3 hashing for store locators and an
//! incremental hasher for whole-stream digests.
//!
//! All hashing goes through the `blake3` crate.

pub mod hasher;
pub mod stream;

pub use hasher::ContentHasher;
pub use stream::StreamHasher;
