//! Anchoring transports.

use crate::error::{AnchorError, AnchorResult};
use async_trait::async_trait;
use chrono::Utc;
use impact_types::{AnchorReceipt, ProofHash};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// External immutable ledger contract.
#[async_trait]
pub trait AnchorTransport: Send + Sync {
    async fn submit_to_ledger(&self, hash: &ProofHash) -> AnchorResult<AnchorReceipt>;
}

#[derive(Default)]
struct LedgerState {
    transient_failures_left: u32,
    always_fail: bool,
    rejection: Option<String>,
    latency: Option<Duration>,
    receipts: HashMap<ProofHash, AnchorReceipt>,
    next_block: u64,
}

/// Deterministic in-process ledger.
///
/// Re-submitting an anchored hash returns the original receipt. Failures can
/// be scripted for tests and local runs.
#[derive(Default)]
pub struct InMemoryAnchorTransport {
    state: Mutex<LedgerState>,
    submissions: AtomicU64,
}

impl InMemoryAnchorTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` submissions transiently.
    pub fn fail_next(&self, n: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.transient_failures_left = n;
        }
    }

    /// Fail every submission transiently until switched back.
    pub fn fail_always(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.always_fail = fail;
        }
    }

    /// Refuse every submission with `reason`; `None` accepts again.
    pub fn reject_with(&self, reason: Option<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.rejection = reason;
        }
    }

    /// Simulated confirmation latency.
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut state) = self.state.lock() {
            state.latency = latency;
        }
    }

    /// Every call to `submit_to_ledger`, successful or not.
    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn anchored_count(&self) -> usize {
        self.state.lock().map(|s| s.receipts.len()).unwrap_or(0)
    }

    pub fn receipt_for(&self, hash: &ProofHash) -> Option<AnchorReceipt> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.receipts.get(hash).cloned())
    }

    fn lock(&self) -> AnchorResult<std::sync::MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|_| AnchorError::Transient("ledger state lock poisoned".to_string()))
    }
}

#[async_trait]
impl AnchorTransport for InMemoryAnchorTransport {
    async fn submit_to_ledger(&self, hash: &ProofHash) -> AnchorResult<AnchorReceipt> {
        self.submissions.fetch_add(1, Ordering::SeqCst);

        let latency = self.lock()?.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock()?;
        if let Some(reason) = &state.rejection {
            return Err(AnchorError::Permanent(reason.clone()));
        }
        if state.always_fail {
            return Err(AnchorError::Transient("ledger unavailable".to_string()));
        }
        if state.transient_failures_left > 0 {
            state.transient_failures_left -= 1;
            return Err(AnchorError::Transient("ledger busy".to_string()));
        }

        if let Some(existing) = state.receipts.get(hash) {
            return Ok(existing.clone());
        }

        state.next_block += 1;
        let block_number = state.next_block;
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"impact-anchor");
        hasher.update(hash.as_str().as_bytes());
        hasher.update(&block_number.to_le_bytes());
        let receipt = AnchorReceipt {
            reference: format!("0x{}", hasher.finalize().to_hex()),
            block_number: Some(block_number),
            anchored_at: Utc::now(),
        };
        state.receipts.insert(hash.clone(), receipt.clone());
        Ok(receipt)
    }
}

#[derive(Debug, Serialize)]
struct AnchorRequest {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct AnchorResponse {
    tx_hash: String,
    #[serde(default)]
    block_number: Option<u64>,
}

/// Anchoring service reached over HTTP: `POST {endpoint}/anchor`.
pub struct HttpAnchorTransport {
    client: Client,
    endpoint: String,
}

impl HttpAnchorTransport {
    pub fn new(endpoint: &str, request_timeout: Duration) -> AnchorResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AnchorError::Permanent(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

fn classify_status(status: StatusCode, body: String) -> AnchorError {
    let message = format!("ledger returned {}: {}", status, body);
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        AnchorError::Transient(message)
    } else {
        AnchorError::Permanent(message)
    }
}

#[async_trait]
impl AnchorTransport for HttpAnchorTransport {
    async fn submit_to_ledger(&self, hash: &ProofHash) -> AnchorResult<AnchorReceipt> {
        let url = format!("{}/anchor", self.endpoint);
        debug!(url = %url, hash = %hash, "submitting proof hash");

        let response = self
            .client
            .post(&url)
            .json(&AnchorRequest {
                hash: hash.to_prefixed(),
            })
            .send()
            .await
            .map_err(|e| AnchorError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let body: AnchorResponse = response
            .json()
            .await
            .map_err(|e| AnchorError::Permanent(format!("unreadable ledger receipt: {}", e)))?;
        if body.tx_hash.trim().is_empty() {
            return Err(AnchorError::Permanent(
                "ledger receipt has no transaction reference".to_string(),
            ));
        }
        Ok(AnchorReceipt {
            reference: body.tx_hash,
            block_number: body.block_number,
            anchored_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::post, Json, Router};
    use std::sync::Arc;

    fn hash(byte: u8) -> ProofHash {
        ProofHash::from_bytes(&[byte; 32])
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn in_memory_ledger_is_idempotent_per_hash() {
        let ledger = InMemoryAnchorTransport::new();
        let first = ledger.submit_to_ledger(&hash(1)).await.unwrap();
        let again = ledger.submit_to_ledger(&hash(1)).await.unwrap();
        let other = ledger.submit_to_ledger(&hash(2)).await.unwrap();

        assert_eq!(first, again);
        assert_ne!(first.reference, other.reference);
        assert_eq!(other.block_number, Some(2));
        assert_eq!(ledger.anchored_count(), 2);
        assert_eq!(ledger.submissions(), 3);
    }

    #[tokio::test]
    async fn scripted_failures() {
        let ledger = InMemoryAnchorTransport::new();
        ledger.fail_next(2);
        assert!(ledger.submit_to_ledger(&hash(1)).await.unwrap_err().is_transient());
        assert!(ledger.submit_to_ledger(&hash(1)).await.unwrap_err().is_transient());
        assert!(ledger.submit_to_ledger(&hash(1)).await.is_ok());

        ledger.reject_with(Some("contract paused".to_string()));
        let err = ledger.submit_to_ledger(&hash(2)).await.unwrap_err();
        assert!(matches!(err, AnchorError::Permanent(_)));
        ledger.reject_with(None);

        ledger.fail_always(true);
        assert!(ledger.submit_to_ledger(&hash(2)).await.is_err());
        assert!(ledger.receipt_for(&hash(2)).is_none());
    }

    #[tokio::test]
    async fn http_transport_reads_receipt() {
        let router = Router::new().route(
            "/anchor",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert!(body["hash"].as_str().unwrap().starts_with("0x"));
                Json(serde_json::json!({ "tx_hash": "0xabc", "block_number": 42 }))
            }),
        );
        let base = serve(router).await;
        let transport = HttpAnchorTransport::new(&base, Duration::from_secs(5)).unwrap();

        let receipt = transport.submit_to_ledger(&hash(3)).await.unwrap();
        assert_eq!(receipt.reference, "0xabc");
        assert_eq!(receipt.block_number, Some(42));
    }

    #[tokio::test]
    async fn http_transport_classifies_statuses() {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        let router = Router::new().route(
            "/anchor",
            post(move || {
                let counter = Arc::clone(&counter);
                async move {
                    match counter.fetch_add(1, Ordering::SeqCst) {
                        0 => (AxumStatus::SERVICE_UNAVAILABLE, "busy"),
                        1 => (AxumStatus::TOO_MANY_REQUESTS, "slow down"),
                        _ => (AxumStatus::BAD_REQUEST, "bad hash"),
                    }
                }
            }),
        );
        let base = serve(router).await;
        let transport = HttpAnchorTransport::new(&base, Duration::from_secs(5)).unwrap();

        assert!(transport.submit_to_ledger(&hash(4)).await.unwrap_err().is_transient());
        assert!(transport.submit_to_ledger(&hash(4)).await.unwrap_err().is_transient());
        let err = transport.submit_to_ledger(&hash(4)).await.unwrap_err();
        assert!(matches!(err, AnchorError::Permanent(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transient() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let transport =
            HttpAnchorTransport::new(&format!("http://{}", addr), Duration::from_secs(2)).unwrap();
        assert!(transport.submit_to_ledger(&hash(5)).await.unwrap_err().is_transient());
    }
}
