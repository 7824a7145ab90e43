use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, ExtractResult};
use crate::stats::ExtractProgressSink;

/// Extraction tuning.
///
/// Loadable from TOML; missing keys take their defaults:
///
/// ```toml
/// num_read_tasks = 8
/// num_write_tasks = 16
/// verify_output = true
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Tasks fetching chunks from the blob store.
    pub num_read_tasks: usize,
    /// Tasks transforming fetched chunks before they are written.
    pub num_decode_tasks: usize,
    /// Tasks writing chunks into output files.
    pub num_write_tasks: usize,
    /// Milliseconds between progress reports.
    pub progress_update_frequency_ms: u64,
    /// Check every fetched chunk, and every finished file, against its hash.
    pub verify_output: bool,
    /// Log each finished file at info level.
    pub verbose_output: bool,
    /// Receives progress reports. No reporting when unset.
    #[serde(skip)]
    pub progress_sink: Option<Arc<dyn ExtractProgressSink>>,
}

impl ExtractOptions {
    /// Default reader count: one per CPU, kept within `4..=32`.
    pub fn default_read_tasks() -> usize {
        num_cpus::get().clamp(4, 32)
    }

    pub fn progress_update_frequency(&self) -> Duration {
        Duration::from_millis(self.progress_update_frequency_ms)
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ExtractProgressSink>) -> Self {
        self.progress_sink = Some(sink);
        self
    }

    pub fn validate(&self) -> ExtractResult<()> {
        for (name, count) in [
            ("num_read_tasks", self.num_read_tasks),
            ("num_decode_tasks", self.num_decode_tasks),
            ("num_write_tasks", self.num_write_tasks),
        ] {
            if count == 0 {
                return Err(ExtractError::InvalidOptions(format!("{name} must be at least 1")));
            }
        }
        if self.progress_update_frequency_ms == 0 {
            return Err(ExtractError::InvalidOptions(
                "progress_update_frequency_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> ExtractResult<Self> {
        let options: Self = toml::from_str(s)?;
        options.validate()?;
        Ok(options)
    }

    pub fn load(path: impl AsRef<Path>) -> ExtractResult<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            num_read_tasks: Self::default_read_tasks(),
            num_decode_tasks: 4,
            num_write_tasks: 16,
            progress_update_frequency_ms: 500,
            verify_output: false,
            verbose_output: false,
            progress_sink: None,
        }
    }
}

impl std::fmt::Debug for ExtractOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractOptions")
            .field("num_read_tasks", &self.num_read_tasks)
            .field("num_decode_tasks", &self.num_decode_tasks)
            .field("num_write_tasks", &self.num_write_tasks)
            .field("progress_update_frequency_ms", &self.progress_update_frequency_ms)
            .field("verify_output", &self.verify_output)
            .field("verbose_output", &self.verbose_output)
            .field("progress_sink", &self.progress_sink.is_some())
            .finish()
    }
}
