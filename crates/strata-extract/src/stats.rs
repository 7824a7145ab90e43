use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Samples kept for the trailing rate.
pub const RATE_WINDOW_SAMPLES: usize = 10;

/// Snapshot handed to an [`ExtractProgressSink`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ExtractProgress {
    pub files_written: u64,
    pub extracted_bytes: u64,
    /// Trailing write rate in bytes per second.
    pub extract_rate_bps: f64,
    pub downloaded_bytes: u64,
    /// Trailing fetch rate in bytes per second.
    pub download_rate_bps: f64,
}

/// Receives periodic progress during extraction.
pub trait ExtractProgressSink: Send + Sync {
    fn on_progress(&self, progress: &ExtractProgress);
}

impl<F> ExtractProgressSink for F
where
    F: Fn(&ExtractProgress) + Send + Sync,
{
    fn on_progress(&self, progress: &ExtractProgress) {
        self(progress)
    }
}

/// Reports progress through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingProgressSink;

impl ExtractProgressSink for LoggingProgressSink {
    fn on_progress(&self, p: &ExtractProgress) {
        info!(
            files = p.files_written,
            extracted_mb = p.extracted_bytes as f64 / 1_048_576.0,
            extract_mbps = p.extract_rate_bps / 1_048_576.0,
            downloaded_mb = p.downloaded_bytes as f64 / 1_048_576.0,
            download_mbps = p.download_rate_bps / 1_048_576.0,
            "extracting"
        );
    }
}

/// Counters shared by the pipeline stages.
#[derive(Debug, Default)]
pub struct ExtractCounters {
    pub files_written: AtomicU64,
    pub extracted_bytes: AtomicU64,
    pub downloaded_bytes: AtomicU64,
}

impl ExtractCounters {
    pub fn add_file(&self) {
        self.files_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_extracted(&self, bytes: u64) {
        self.extracted_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_downloaded(&self, bytes: u64) {
        self.downloaded_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    fn load(&self) -> (u64, u64, u64) {
        (
            self.files_written.load(Ordering::Relaxed),
            self.extracted_bytes.load(Ordering::Relaxed),
            self.downloaded_bytes.load(Ordering::Relaxed),
        )
    }
}

/// Rate over the last few samples of a monotonically growing counter.
#[derive(Debug)]
pub struct RateWindow {
    samples: VecDeque<(Instant, u64)>,
    capacity: usize,
}

impl RateWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity: capacity.max(2),
        }
    }

    /// Record `value` at `at` and return the rate across the window.
    pub fn push(&mut self, at: Instant, value: u64) -> f64 {
        self.samples.push_back((at, value));
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
        match (self.samples.front(), self.samples.back()) {
            (Some(&(t0, v0)), Some(&(t1, v1))) if t1 > t0 => {
                v1.saturating_sub(v0) as f64 / (t1 - t0).as_secs_f64()
            }
            _ => 0.0,
        }
    }
}

/// Final figures for a completed extraction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtractStats {
    pub files_written: u64,
    pub extracted_bytes: u64,
    pub downloaded_bytes: u64,
    pub elapsed: Duration,
}

impl ExtractStats {
    pub(crate) fn from_counters(counters: &ExtractCounters, elapsed: Duration) -> Self {
        let (files_written, extracted_bytes, downloaded_bytes) = counters.load();
        Self {
            files_written,
            extracted_bytes,
            downloaded_bytes,
            elapsed,
        }
    }

    /// Average write rate over the whole run.
    pub fn extract_rate_bps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.extracted_bytes as f64 / secs
        } else {
            0.0
        }
    }
}

/// Sample counters every `frequency` until `token` fires, then report once
/// more so the sink always sees the final totals.
pub async fn run_stats(
    counters: Arc<ExtractCounters>,
    sink: Arc<dyn ExtractProgressSink>,
    frequency: Duration,
    token: CancellationToken,
) {
    let mut extract_rate = RateWindow::new(RATE_WINDOW_SAMPLES);
    let mut download_rate = RateWindow::new(RATE_WINDOW_SAMPLES);
    let mut report = || {
        let now = Instant::now();
        let (files_written, extracted_bytes, downloaded_bytes) = counters.load();
        sink.on_progress(&ExtractProgress {
            files_written,
            extracted_bytes,
            extract_rate_bps: extract_rate.push(now, extracted_bytes),
            downloaded_bytes,
            download_rate_bps: download_rate.push(now, downloaded_bytes),
        });
    };

    let mut ticker = tokio::time::interval(frequency);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => report(),
        }
    }
    report();
}
