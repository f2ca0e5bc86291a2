//! Per-host request spacing. Every worker that talks to the same host shares
//! one slot, so the spacing holds across the whole pool, not per worker.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolitenessConfig {
    pub base_interval: Duration,
    pub jitter_range: Duration,
}

pub struct PolitenessGate {
    cfg: PolitenessConfig,
    /// host → time of the last permitted request. The mutex is held while
    /// waiting, which serializes acquisitions for that host.
    slots: DashMap<String, Arc<Mutex<Option<Instant>>>>,
}

impl PolitenessGate {
    pub fn new(cfg: PolitenessConfig) -> Self {
        Self {
            cfg,
            slots: DashMap::new(),
        }
    }

    /// Block until `base_interval + uniform(0, jitter_range)` has passed since
    /// the last request permitted for `host`, then record now as the new last.
    pub async fn acquire(&self, host: &str) {
        let slot = self
            .slots
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();

        let mut last = slot.lock().await;
        if let Some(prev) = *last {
            let spacing = self.cfg.base_interval + jitter_up_to(self.cfg.jitter_range);
            let ready_at = prev + spacing;
            if ready_at > Instant::now() {
                let wait_ms = (ready_at - Instant::now()).as_millis() as u64;
                debug!(host, wait_ms, "politeness wait");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    pub fn tracked_hosts(&self) -> usize {
        self.slots.len()
    }
}

/// Uniform random duration in `0..=max`, at millisecond resolution.
pub(crate) fn jitter_up_to(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}
