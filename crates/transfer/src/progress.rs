use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chunkwise_protocol::UploadProgress;

use crate::ChunkPlan;

/// Progress to report once chunk `index` has been acknowledged.
pub fn chunk_progress(plan: &ChunkPlan, index: u64) -> UploadProgress {
    UploadProgress::new(plan.bytes_through(index), plan.file_size())
}

/// Progress baseline for a transfer resuming at `next_chunk`.
pub fn resume_progress(plan: &ChunkPlan, next_chunk: u64) -> UploadProgress {
    UploadProgress::new(plan.bytes_before(next_chunk), plan.file_size())
}

/// Formats a byte count with binary units (`512 B`, `1.5 KiB`, `10.0 MiB`).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

/// Transfer rate over a sliding time window.
///
/// Fed with cumulative byte counts, the way progress is reported.
#[derive(Debug, Clone)]
pub struct SpeedCalculator {
    samples: VecDeque<(Instant, u64)>,
    window: Duration,
    max_samples: usize,
}

impl Default for SpeedCalculator {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), 100)
    }
}

impl SpeedCalculator {
    pub fn new(window: Duration, max_samples: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            window,
            max_samples: max_samples.max(2),
        }
    }

    /// Records that `bytes_sent` bytes have been sent so far.
    pub fn record(&mut self, bytes_sent: u64) {
        self.record_at(Instant::now(), bytes_sent);
    }

    fn record_at(&mut self, now: Instant, bytes_sent: u64) {
        if self
            .samples
            .back()
            .is_some_and(|&(_, last)| bytes_sent < last)
        {
            self.samples.clear();
        }
        self.samples.push_back((now, bytes_sent));

        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
        if let Some(cutoff) = now.checked_sub(self.window) {
            while self.samples.len() > 2 && self.samples[0].0 < cutoff {
                self.samples.pop_front();
            }
        }
    }

    /// Bytes per second across the window; 0 until two samples exist.
    pub fn bytes_per_second(&self) -> f64 {
        let (Some(&(t0, b0)), Some(&(t1, b1))) = (self.samples.front(), self.samples.back())
        else {
            return 0.0;
        };
        let elapsed = t1.duration_since(t0).as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        (b1 - b0) as f64 / elapsed
    }

    /// Time left for `remaining_bytes` at the current rate.
    pub fn eta(&self, remaining_bytes: u64) -> Option<Duration> {
        let rate = self.bytes_per_second();
        (rate > 0.0).then(|| Duration::from_secs_f64(remaining_bytes as f64 / rate))
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}
