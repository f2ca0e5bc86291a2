//! Fetch latency histogram. The fetcher records every delivered response,
//! the binary reads percentiles for the end-of-run summary.

use std::sync::Mutex;
use std::time::Duration;

/// Values stored in milliseconds.
pub struct FetchLatency {
    inner: Mutex<hdrhistogram::Histogram<u64>>,
}

impl FetchLatency {
    /// Tracks 1ms to 10min, 3 significant figures.
    pub fn new() -> Self {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, 600_000, 3)
            .expect("valid histogram bounds");
        Self {
            inner: Mutex::new(histogram),
        }
    }

    pub fn record(&self, d: Duration) {
        let ms = d.as_millis().clamp(1, 600_000) as u64;
        if let Ok(mut h) = self.inner.lock() {
            let _ = h.record(ms);
        }
    }

    /// (p50_ms, p95_ms, max_ms). None if no samples.
    pub fn percentiles(&self) -> Option<(u64, u64, u64)> {
        let h = self.inner.lock().ok()?;
        if h.len() == 0 {
            return None;
        }
        Some((
            h.value_at_quantile(0.5),
            h.value_at_quantile(0.95),
            h.max(),
        ))
    }

    pub fn len(&self) -> u64 {
        self.inner.lock().map(|h| h.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FetchLatency {
    fn default() -> Self {
        Self::new()
    }
}
