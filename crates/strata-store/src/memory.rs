use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use strata_crypto::ContentHasher;
use strata_types::ObjectId;

use crate::error::StoreResult;
use crate::traits::BlobStore;

#[derive(Default)]
struct Inner {
    blobs: HashMap<ObjectId, Bytes>,
    /// Every `put` in call order, duplicates included.
    put_log: Vec<ObjectId>,
}

/// In-memory, HashMap-based blob store.
///
/// Intended for tests, scratch space and embedding. All blobs are held in
/// memory behind a `RwLock`; `Bytes` makes reads a cheap reference-count
/// bump.
pub struct InMemoryBlobStore {
    inner: RwLock<Inner>,
}

impl InMemoryBlobStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Number of distinct blobs currently stored.
    pub fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").blobs.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().expect("lock poisoned").blobs.is_empty()
    }

    /// Total bytes across all distinct blobs.
    pub fn total_bytes(&self) -> u64 {
        self.inner
            .read()
            .expect("lock poisoned")
            .blobs
            .values()
            .map(|b| b.len() as u64)
            .sum()
    }

    /// Locators of every `put` call in the order they happened.
    pub fn put_log(&self) -> Vec<ObjectId> {
        self.inner.read().expect("lock poisoned").put_log.clone()
    }

    /// Replace the bytes stored under `locator` without changing the key.
    ///
    /// Breaks the content-addressing invariant on purpose; only useful for
    /// exercising corruption handling in tests.
    pub fn overwrite_unchecked(&self, locator: ObjectId, data: Bytes) {
        self.inner
            .write()
            .expect("lock poisoned")
            .blobs
            .insert(locator, data);
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get(&self, locator: &ObjectId) -> StoreResult<Option<Bytes>> {
        let inner = self.inner.read().expect("lock poisoned");
        Ok(inner.blobs.get(locator).cloned())
    }

    async fn put(&self, data: Bytes) -> StoreResult<ObjectId> {
        let locator = ContentHasher::BLOB.hash(&data);
        let mut inner = self.inner.write().expect("lock poisoned");
        inner.put_log.push(locator);
        // Idempotent: the same locator always maps to the same content.
        inner.blobs.entry(locator).or_insert(data);
        Ok(locator)
    }

    async fn exists(&self, locator: &ObjectId) -> StoreResult<bool> {
        let inner = self.inner.read().expect("lock poisoned");
        Ok(inner.blobs.contains_key(locator))
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len())
            .finish()
    }
}
