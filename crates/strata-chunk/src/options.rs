use serde::{Deserialize, Serialize};
use strata_node::SchemaVersion;

use crate::error::{ChunkError, ChunkResult};

/// Size bounds for leaf chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeafOptions {
    pub min_size: usize,
    pub target_size: usize,
    pub max_size: usize,
}

impl LeafOptions {
    pub fn new(min_size: usize, target_size: usize, max_size: usize) -> Self {
        Self {
            min_size,
            target_size,
            max_size,
        }
    }

    pub fn validate(&self) -> ChunkResult<()> {
        if self.min_size == 0 {
            return Err(ChunkError::InvalidOptions("leaf min_size must be non-zero".into()));
        }
        if !(self.min_size <= self.target_size && self.target_size <= self.max_size) {
            return Err(ChunkError::InvalidOptions(format!(
                "leaf sizes must satisfy min <= target <= max, got {}/{}/{}",
                self.min_size, self.target_size, self.max_size
            )));
        }
        Ok(())
    }
}

impl Default for LeafOptions {
    fn default() -> Self {
        Self {
            min_size: 32 * 1024,
            target_size: 64 * 1024,
            max_size: 256 * 1024,
        }
    }
}

/// Fan-out bounds for interior nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteriorOptions {
    pub min_child_count: usize,
    pub target_child_count: usize,
    pub max_child_count: usize,
    /// A child whose split key falls below this closes its group.
    /// Derived from `target_child_count` when unset.
    pub slice_threshold: Option<u32>,
    /// Schema revision new interior nodes are written with.
    pub schema_version: SchemaVersion,
}

impl InteriorOptions {
    pub fn new(min_child_count: usize, target_child_count: usize, max_child_count: usize) -> Self {
        Self {
            min_child_count,
            target_child_count,
            max_child_count,
            ..Self::default()
        }
    }

    /// Effective split threshold: `2^32 / target_child_count` unless overridden.
    pub fn slice_threshold(&self) -> u32 {
        self.slice_threshold.unwrap_or_else(|| {
            let target = self.target_child_count.max(1) as u64;
            ((1u64 << 32) / target).min(u32::MAX as u64) as u32
        })
    }

    pub fn validate(&self) -> ChunkResult<()> {
        if self.min_child_count < 2 {
            return Err(ChunkError::InvalidOptions(
                "interior min_child_count must be at least 2".into(),
            ));
        }
        if !(self.min_child_count <= self.target_child_count
            && self.target_child_count <= self.max_child_count)
        {
            return Err(ChunkError::InvalidOptions(format!(
                "child counts must satisfy min <= target <= max, got {}/{}/{}",
                self.min_child_count, self.target_child_count, self.max_child_count
            )));
        }
        Ok(())
    }
}

impl Default for InteriorOptions {
    fn default() -> Self {
        Self {
            min_child_count: 4,
            target_child_count: 16,
            max_child_count: 64,
            slice_threshold: None,
            schema_version: SchemaVersion::LATEST,
        }
    }
}

/// Leaf and interior options together.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingOptions {
    pub leaf: LeafOptions,
    pub interior: InteriorOptions,
}

impl ChunkingOptions {
    pub fn validate(&self) -> ChunkResult<()> {
        self.leaf.validate()?;
        self.interior.validate()
    }
}
