//! Content-defined chunk boundaries.
//!
//! A gear hash (`h = (h << 1) + GEAR[byte]`) is rolled over the window. Bit
//! `k` of the 64-bit state only depends on the last `k + 1` bytes, so the
//! upper half used for the boundary test depends on the trailing
//! [`WINDOW_SIZE`] bytes alone. Scanning starts `WINDOW_SIZE` bytes before
//! `min_size` so every candidate cut sees a full window.

use std::sync::LazyLock;

use crate::options::LeafOptions;

/// Number of trailing bytes that influence a boundary decision.
pub const WINDOW_SIZE: usize = 64;

static GEAR: LazyLock<[u64; 256]> = LazyLock::new(|| {
    let mut table = [0u64; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        let key = blake3::derive_key("strata chunk boundary gear v1", &[i as u8]);
        let mut word = [0u8; 8];
        word.copy_from_slice(&key[..8]);
        *slot = u64::from_le_bytes(word);
    }
    table
});

/// A cut point found by [`BoundaryFinder::find`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cut {
    /// Length of the chunk, measured from the start of the window.
    pub length: usize,
    /// Rolling hash value at the cut.
    pub rolling_hash: u32,
}

/// Locates chunk boundaries for fixed size bounds.
#[derive(Clone, Copy, Debug)]
pub struct BoundaryFinder {
    min_size: usize,
    max_size: usize,
    threshold: u32,
}

impl BoundaryFinder {
    pub fn new(options: &LeafOptions) -> Self {
        let spread = options.target_size.saturating_sub(options.min_size) as u64;
        let threshold = if spread == 0 {
            u32::MAX
        } else {
            (u32::MAX as u64 / spread) as u32
        };
        Self {
            min_size: options.min_size.max(1),
            max_size: options.max_size.max(options.min_size).max(1),
            threshold,
        }
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Find the next cut in `window`, which starts at a chunk boundary.
    ///
    /// `is_final` says no bytes follow the window. Returns `None` when the
    /// window is empty, or when it is shorter than `max_size`, holds no
    /// qualifying boundary and more input may still arrive.
    pub fn find(&self, window: &[u8], is_final: bool) -> Option<Cut> {
        if window.is_empty() {
            return None;
        }
        let limit = window.len().min(self.max_size);
        let warm_from = self.min_size.saturating_sub(WINDOW_SIZE).min(limit);

        let mut hash = 0u64;
        for &byte in &window[warm_from..limit.min(self.min_size - 1)] {
            hash = roll(hash, byte);
        }
        // Candidate cut lengths `min_size..=limit`; byte `len - 1` is the last in the chunk.
        for len in self.min_size..=limit {
            hash = roll(hash, window[len - 1]);
            let rolling_hash = (hash >> 32) as u32;
            if rolling_hash < self.threshold || len == self.max_size {
                return Some(Cut {
                    length: len,
                    rolling_hash,
                });
            }
        }

        if is_final {
            // Short tail, or a window that ran out before any boundary.
            return Some(Cut {
                length: limit,
                rolling_hash: (hash >> 32) as u32,
            });
        }
        None
    }

    /// Split a complete buffer into chunks.
    pub fn split<'a>(&self, data: &'a [u8]) -> Boundaries<'a> {
        Boundaries {
            finder: *self,
            data,
            position: 0,
        }
    }
}

/// Free-function form of [`BoundaryFinder::find`].
pub fn find_boundary(
    window: &[u8],
    min_size: usize,
    max_size: usize,
    target_size: usize,
    is_final: bool,
) -> Option<Cut> {
    BoundaryFinder::new(&LeafOptions::new(min_size, target_size, max_size)).find(window, is_final)
}

#[inline]
fn roll(hash: u64, byte: u8) -> u64 {
    (hash << 1).wrapping_add(GEAR[byte as usize])
}

/// Iterator over the cuts of an in-memory buffer.
pub struct Boundaries<'a> {
    finder: BoundaryFinder,
    data: &'a [u8],
    position: usize,
}

impl Iterator for Boundaries<'_> {
    type Item = Cut;

    fn next(&mut self) -> Option<Cut> {
        let cut = self.finder.find(&self.data[self.position..], true)?;
        self.position += cut.length;
        Some(cut)
    }
}
