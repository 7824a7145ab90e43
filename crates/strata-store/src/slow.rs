//! A [`BlobStore`] wrapper that adds configurable random latency.
//!
//! `SlowBlobStore` wraps any `Arc<dyn BlobStore>` and sleeps for a random
//! duration before each read or write. The RNG is seeded so test runs are
//! reproducible.
//!
//! ```ignore
//! let slow = SlowBlobStore::new(inner)
//!     .read_latency(5, 20)    // 5–20 ms per get
//!     .seed(42);
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata_types::ObjectId;

use crate::error::StoreResult;
use crate::traits::BlobStore;

/// A [`BlobStore`] wrapper that injects random latency before I/O.
///
/// Useful for surfacing ordering and cancellation bugs that an instant
/// in-memory store hides.
pub struct SlowBlobStore {
    inner: Arc<dyn BlobStore>,
    read_latency_ms: (u64, u64),
    write_latency_ms: (u64, u64),
    rng: Mutex<StdRng>,
}

impl SlowBlobStore {
    /// Wrap an existing store with zero latency (pass-through) by default.
    pub fn new(inner: Arc<dyn BlobStore>) -> Self {
        Self {
            inner,
            read_latency_ms: (0, 0),
            write_latency_ms: (0, 0),
            rng: Mutex::new(StdRng::seed_from_u64(0)),
        }
    }

    /// Set the read latency range in milliseconds (uniform random).
    pub fn read_latency(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.read_latency_ms = (min_ms, max_ms);
        self
    }

    /// Set the write latency range in milliseconds (uniform random).
    pub fn write_latency(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.write_latency_ms = (min_ms, max_ms);
        self
    }

    /// Set the RNG seed.
    pub fn seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    async fn delay(&self, (min, max): (u64, u64)) {
        if max == 0 {
            return;
        }
        let ms = if min >= max {
            max
        } else {
            self.rng.lock().expect("lock poisoned").gen_range(min..=max)
        };
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[async_trait]
impl BlobStore for SlowBlobStore {
    async fn get(&self, locator: &ObjectId) -> StoreResult<Option<Bytes>> {
        self.delay(self.read_latency_ms).await;
        self.inner.get(locator).await
    }

    async fn put(&self, data: Bytes) -> StoreResult<ObjectId> {
        self.delay(self.write_latency_ms).await;
        self.inner.put(data).await
    }

    async fn exists(&self, locator: &ObjectId) -> StoreResult<bool> {
        self.inner.exists(locator).await
    }
}
