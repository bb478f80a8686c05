use crate::error::{AnchorError, AnchorResult};
use crate::transport::AnchorTransport;
use impact_types::{AnchorReceipt, ProofHash};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Bounded exponential backoff for transient anchor failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: u32,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            multiplier: default_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_multiplier() -> u32 {
    2
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

impl RetryPolicy {
    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based): 500ms, 1s, 2s, ...
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = u64::from(self.multiplier.max(1)).saturating_pow(retry.saturating_sub(1));
        let millis = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }

    /// Sum of every backoff taken when all attempts fail.
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts.max(1)).map(|retry| self.delay_for(retry)).sum()
    }
}

/// Submits proof hashes and turns ledger answers into receipts.
pub struct AnchoringAdapter {
    transport: Arc<dyn AnchorTransport>,
    retry: RetryPolicy,
    request_timeout: Option<Duration>,
}

impl AnchoringAdapter {
    pub fn new(transport: Arc<dyn AnchorTransport>, retry: RetryPolicy) -> Self {
        Self {
            transport,
            retry,
            request_timeout: None,
        }
    }

    /// Bound every single submission; an expired one counts as transient.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Longest a `submit_hash` call can take, known only when submissions
    /// are bounded.
    pub fn worst_case(&self) -> Option<Duration> {
        let per_attempt = self.request_timeout?;
        Some(per_attempt * self.retry.max_attempts.max(1) + self.retry.total_backoff())
    }

    /// Validate `hash` and anchor it. Malformed input fails without touching
    /// the transport.
    pub async fn submit(&self, hash: &str) -> AnchorResult<AnchorReceipt> {
        let hash = ProofHash::parse(hash)?;
        self.submit_hash(&hash).await
    }

    /// Anchor an already-validated hash, retrying transient failures only.
    #[instrument(skip(self), fields(hash = %hash))]
    pub async fn submit_hash(&self, hash: &ProofHash) -> AnchorResult<AnchorReceipt> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.submit_once(hash).await {
                Ok(receipt) => {
                    info!(attempt, reference = %receipt.reference, "proof anchored");
                    return Ok(receipt);
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient anchor failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) if err.is_transient() => {
                    return Err(AnchorError::Exhausted {
                        attempts: attempt,
                        last_error: err.to_string(),
                    });
                }
                Err(err) => {
                    warn!(attempt, error = %err, "anchor submission rejected");
                    return Err(err);
                }
            }
        }
    }

    async fn submit_once(&self, hash: &ProofHash) -> AnchorResult<AnchorReceipt> {
        let Some(limit) = self.request_timeout else {
            return self.transport.submit_to_ledger(hash).await;
        };
        match tokio::time::timeout(limit, self.transport.submit_to_ledger(hash)).await {
            Ok(result) => result,
            Err(_) => Err(AnchorError::Transient(format!(
                "no confirmation within {}ms",
                limit.as_millis()
            ))),
        }
    }
}
