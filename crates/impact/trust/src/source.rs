//! Trust verdict sources.

use crate::error::{TrustError, TrustResult};
use crate::policy::TrustThresholds;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use impact_types::{OrgId, TrustVerdict};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// External reputation service contract.
#[async_trait]
pub trait TrustSource: Send + Sync {
    async fn fetch_trust_verdict(&self, org_id: &OrgId) -> TrustResult<TrustVerdict>;
}

/// Fixed score table. Unknown organizations score 0.
#[derive(Default)]
pub struct InMemoryTrustSource {
    scores: DashMap<OrgId, u8>,
    thresholds: TrustThresholds,
    unavailable: AtomicBool,
    fetches: AtomicU64,
}

impl InMemoryTrustSource {
    pub fn new(thresholds: TrustThresholds) -> Self {
        Self {
            thresholds,
            ..Self::default()
        }
    }

    pub fn with_scores<I, K>(thresholds: TrustThresholds, scores: I) -> Self
    where
        I: IntoIterator<Item = (K, u8)>,
        K: Into<OrgId>,
    {
        let source = Self::new(thresholds);
        for (org, score) in scores {
            source.set_score(org, score);
        }
        source
    }

    pub fn set_score(&self, org_id: impl Into<OrgId>, score: u8) {
        self.scores.insert(org_id.into(), score);
    }

    /// Make every fetch fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrustSource for InMemoryTrustSource {
    async fn fetch_trust_verdict(&self, org_id: &OrgId) -> TrustResult<TrustVerdict> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TrustError::Unavailable("in-memory source switched off".to_string()));
        }
        let score = self.scores.get(org_id).map(|s| *s.value()).unwrap_or(0);
        Ok(self.thresholds.verdict_for(org_id.clone(), score, Utc::now()))
    }
}

#[derive(Debug, Serialize)]
struct VerifyNgoRequest<'a> {
    ngo_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyNgoResponse {
    trust_score: f64,
}

/// Reputation service reached over HTTP: `POST {base}/verify_ngo`.
pub struct HttpTrustSource {
    client: Client,
    base_url: String,
    thresholds: TrustThresholds,
}

impl HttpTrustSource {
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        thresholds: TrustThresholds,
    ) -> TrustResult<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            thresholds,
        })
    }
}

#[async_trait]
impl TrustSource for HttpTrustSource {
    async fn fetch_trust_verdict(&self, org_id: &OrgId) -> TrustResult<TrustVerdict> {
        let url = format!("{}/verify_ngo", self.base_url);
        debug!(url = %url, org_id = %org_id, "fetching trust score");

        let response = self
            .client
            .post(&url)
            .json(&VerifyNgoRequest {
                ngo_name: org_id.as_str(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrustError::Unavailable(format!(
                "reputation service returned {}",
                status
            )));
        }

        let body: VerifyNgoResponse = response
            .json()
            .await
            .map_err(|e| TrustError::InvalidResponse(e.to_string()))?;
        if !body.trust_score.is_finite() {
            return Err(TrustError::InvalidResponse(format!(
                "non-finite trust score {}",
                body.trust_score
            )));
        }
        let score = body.trust_score.round().clamp(0.0, 100.0) as u8;
        Ok(self.thresholds.verdict_for(org_id.clone(), score, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn in_memory_source_scores_and_fails_on_demand() {
        let source = InMemoryTrustSource::with_scores(
            TrustThresholds::default(),
            [("org-good", 90u8), ("org-mid", 65u8)],
        );

        let good = source
            .fetch_trust_verdict(&OrgId::new("org-good"))
            .await
            .unwrap();
        assert!(good.verified && good.dashboard_access);
        let unknown = source
            .fetch_trust_verdict(&OrgId::new("org-x"))
            .await
            .unwrap();
        assert!(!unknown.verified);

        source.set_unavailable(true);
        assert!(source
            .fetch_trust_verdict(&OrgId::new("org-mid"))
            .await
            .is_err());
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test]
    async fn http_source_maps_trust_score() {
        let router = Router::new().route(
            "/verify_ngo",
            post(|Json(body): Json<serde_json::Value>| async move {
                let score = if body["ngo_name"] == "Green Earth" { 82.4 } else { 40.0 };
                Json(serde_json::json!({ "trust_score": score }))
            }),
        );
        let base = serve(router).await;
        let source =
            HttpTrustSource::new(&base, Duration::from_secs(5), TrustThresholds::default())
                .unwrap();

        let verdict = source
            .fetch_trust_verdict(&OrgId::new("Green Earth"))
            .await
            .unwrap();
        assert_eq!(verdict.score, 82);
        assert!(verdict.verified && verdict.dashboard_access);

        let other = source
            .fetch_trust_verdict(&OrgId::new("Unknown NGO"))
            .await
            .unwrap();
        assert!(!other.verified);
    }

    #[tokio::test]
    async fn http_source_reports_server_errors() {
        let router = Router::new().route(
            "/verify_ngo",
            post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = serve(router).await;
        let source =
            HttpTrustSource::new(&base, Duration::from_secs(5), TrustThresholds::default())
                .unwrap();

        let err = source
            .fetch_trust_verdict(&OrgId::new("org"))
            .await
            .unwrap_err();
        assert!(matches!(err, TrustError::Unavailable(_)));
    }
}
