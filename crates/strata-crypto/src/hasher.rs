use strata_types::ObjectId;

/// Domain-separated BLAKE3 hasher for store locators.
///
/// Hashing runs in BLAKE3's key-derivation mode with the domain string as
/// context, so a locator is never equal to the plain content hash of the
/// same bytes. Nodes record the plain hash; stores file blobs under the
/// locator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentHasher {
    context: &'static str,
}

impl ContentHasher {
    /// Locators for blobs in every store backend.
    pub const BLOB: Self = Self::new("strata 2024 blob locator v1");

    pub const fn new(context: &'static str) -> Self {
        Self { context }
    }

    pub fn hash(&self, data: &[u8]) -> ObjectId {
        let mut hasher = blake3::Hasher::new_derive_key(self.context);
        hasher.update(data);
        ObjectId::from_hash(*hasher.finalize().as_bytes())
    }

    /// Whether `data` hashes to `expected` under this domain.
    pub fn verify(&self, data: &[u8], expected: &ObjectId) -> bool {
        self.hash(data) == *expected
    }

    pub fn context(&self) -> &'static str {
        self.context
    }
}
