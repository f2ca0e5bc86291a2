use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::fetcher::backoff::BackoffPolicy;
use crate::fetcher::transport::Transport;
use crate::metrics::FetchLatency;
use crate::politeness::PolitenessGate;
use crate::types::FetchOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Attempts per transport before falling through to the next one.
    pub max_retries_per_transport: u32,
    /// Deadline for a single attempt. Exceeding it is a transient failure.
    pub attempt_timeout: Duration,
    pub backoff: BackoffPolicy,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_retries_per_transport: 3,
            attempt_timeout: Duration::from_secs(30),
            backoff: BackoffPolicy::default(),
        }
    }
}

/// One logical GET over an ordered list of transports, each with bounded
/// retries. Shared by every worker of a run.
pub struct ResilientFetcher {
    transports: Vec<Arc<dyn Transport>>,
    gate: Arc<PolitenessGate>,
    policy: FetchPolicy,
    latency: Arc<FetchLatency>,
}

impl ResilientFetcher {
    pub fn new(
        transports: Vec<Arc<dyn Transport>>,
        gate: Arc<PolitenessGate>,
        policy: FetchPolicy,
        latency: Arc<FetchLatency>,
    ) -> Self {
        Self {
            transports,
            gate,
            policy,
            latency,
        }
    }

    pub fn transport_names(&self) -> Vec<String> {
        self.transports.iter().map(|t| t.name().to_string()).collect()
    }

    /// Fetch `url` and hand the JSON body to `parse`.
    ///
    /// An attempt only counts as a success when the status is 2xx, the body is
    /// JSON, and `parse` accepts it. Everything else is retried, then the next
    /// transport is tried. Returns `Success` or `PermanentFailure`.
    pub async fn fetch<T, P>(
        &self,
        url: &str,
        headers: &[(String, String)],
        parse: P,
    ) -> FetchOutcome<T>
    where
        P: Fn(&serde_json::Value) -> Result<T, String> + Send + Sync,
        T: Send,
    {
        let max = self.policy.max_retries_per_transport;
        let mut last_reason = String::from("no transports configured");

        for transport in &self.transports {
            for attempt in 0..max {
                match self.attempt(transport.as_ref(), url, headers, &parse).await {
                    FetchOutcome::Success(v) => {
                        if attempt > 0 {
                            debug!(transport = transport.name(), attempt, url, "fetch recovered");
                        }
                        return FetchOutcome::Success(v);
                    }
                    FetchOutcome::TransientFailure(reason)
                    | FetchOutcome::PermanentFailure(reason) => {
                        debug!(
                            transport = transport.name(),
                            attempt,
                            url,
                            %reason,
                            "fetch attempt failed"
                        );
                        last_reason = format!("{}: {reason}", transport.name());
                        if attempt + 1 < max {
                            tokio::time::sleep(self.policy.backoff.delay(attempt)).await;
                        }
                    }
                }
            }
            warn!(transport = transport.name(), url, "transport exhausted after {max} attempts");
        }

        FetchOutcome::PermanentFailure(format!(
            "all transports exhausted for {url} ({last_reason})"
        ))
    }

    async fn attempt<T, P>(
        &self,
        transport: &dyn Transport,
        url: &str,
        headers: &[(String, String)],
        parse: &P,
    ) -> FetchOutcome<T>
    where
        P: Fn(&serde_json::Value) -> Result<T, String> + Send + Sync,
    {
        self.gate.acquire(&transport.host_for(url)).await;

        let started = Instant::now();
        let timeout = self.policy.attempt_timeout;
        let resp = match tokio::time::timeout(timeout, transport.get(url, headers)).await {
            Err(_) => {
                return FetchOutcome::TransientFailure(TransportError::Timeout(timeout).to_string())
            }
            Ok(Err(e)) => return FetchOutcome::TransientFailure(e.to_string()),
            Ok(Ok(r)) => r,
        };
        self.latency.record(started.elapsed());

        if !resp.is_success() {
            return FetchOutcome::TransientFailure(format!("HTTP {}", resp.status));
        }

        let value: serde_json::Value = match serde_json::from_str(&resp.body) {
            Ok(v) => v,
            Err(e) => return FetchOutcome::TransientFailure(format!("malformed body: {e}")),
        };

        match parse(&value) {
            Ok(v) => FetchOutcome::Success(v),
            Err(reason) => FetchOutcome::TransientFailure(format!("incomplete payload: {reason}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
