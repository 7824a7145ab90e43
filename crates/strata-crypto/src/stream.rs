use strata_types::ObjectId;

/// Incremental whole-stream hasher.
///
/// Bytes are folded in as they are read, so the resulting digest is
/// independent of how the stream was later split into chunks or grouped into
/// a tree. The digest equals `ObjectId::from_bytes` over the concatenated
/// input.
#[derive(Clone, Default)]
pub struct StreamHasher {
    inner: blake3::Hasher,
    length: u64,
}

impl StreamHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold more bytes into the digest.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
        self.length += data.len() as u64;
    }

    /// Number of bytes hashed so far.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Digest of everything hashed so far. The hasher stays usable.
    pub fn digest(&self) -> ObjectId {
        ObjectId::from_hash(*self.inner.finalize().as_bytes())
    }
}

impl std::fmt::Debug for StreamHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHasher")
            .field("length", &self.length)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incremental_matches_one_shot() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let mut hasher = StreamHasher::new();
        for piece in data.chunks(333) {
            hasher.update(piece);
        }
        assert_eq!(hasher.digest(), ObjectId::from_bytes(&data));
        assert_eq!(hasher.length(), data.len() as u64);
    }

    #[test]
    fn empty_stream_digest() {
        assert_eq!(StreamHasher::new().digest(), ObjectId::from_bytes(b""));
    }
}
