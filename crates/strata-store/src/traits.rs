use async_trait::async_trait;
use bytes::Bytes;
use strata_types::ObjectId;

use crate::error::{StoreError, StoreResult};

/// Content-addressed blob store.
///
/// All implementations must satisfy these invariants:
/// - Blobs are immutable once written. The same bytes always produce the same
///   locator, so a repeated `put` is a no-op.
/// - Concurrent reads are always safe (blobs are immutable).
/// - The store never interprets blob contents. Node headers, child lists and
///   leaf payloads are all opaque bytes here.
/// - All I/O errors are propagated, never silently ignored. Retrying is the
///   implementation's business; callers treat every error as final.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read a blob by its locator.
    ///
    /// Returns `Ok(None)` if the blob does not exist.
    async fn get(&self, locator: &ObjectId) -> StoreResult<Option<Bytes>>;

    /// Write a blob and return its locator.
    async fn put(&self, data: Bytes) -> StoreResult<ObjectId>;

    /// Check whether a blob exists.
    async fn exists(&self, locator: &ObjectId) -> StoreResult<bool>;

    /// Read a blob that is expected to exist.
    async fn read(&self, locator: &ObjectId) -> StoreResult<Bytes> {
        self.get(locator)
            .await?
            .ok_or(StoreError::NotFound(*locator))
    }

    /// Write multiple blobs in order and return their locators.
    ///
    /// Default implementation calls `put()` for each blob. Backends may
    /// override for better performance.
    async fn put_batch(&self, blobs: Vec<Bytes>) -> StoreResult<Vec<ObjectId>> {
        let mut locators = Vec::with_capacity(blobs.len());
        for blob in blobs {
            locators.push(self.put(blob).await?);
        }
        Ok(locators)
    }
}
