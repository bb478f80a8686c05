//! Cached trust lookups.

use crate::error::{TrustError, TrustResult};
use crate::policy::TrustThresholds;
use crate::source::TrustSource;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use impact_types::{OrgId, TrustLookup, TrustVerdict, VerdictSource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Trust gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Freshness window for a cached verdict.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Upper bound on a single fetch from the reputation source.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Background refresh period; 0 disables the refresh task.
    #[serde(default)]
    pub refresh_interval_secs: u64,

    /// Reputation service base URL. Unset means an in-memory score table.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub thresholds: TrustThresholds,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            refresh_interval_secs: 0,
            endpoint: None,
            thresholds: TrustThresholds::default(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_fetch_timeout_ms() -> u64 {
    5_000
}

impl TrustConfig {
    pub fn ttl(&self) -> chrono::Duration {
        let secs = self.ttl_secs.min(u64::from(u32::MAX)) as i64;
        chrono::Duration::seconds(secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

/// Caches verdicts per organization and never fails a lookup.
pub struct TrustGate {
    source: Arc<dyn TrustSource>,
    cache: DashMap<OrgId, TrustVerdict>,
    config: TrustConfig,
}

impl TrustGate {
    pub fn new(source: Arc<dyn TrustSource>, config: TrustConfig) -> Self {
        Self {
            source,
            cache: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    /// Current verdict for `org_id`.
    ///
    /// Fresh cache hit, else a fetch. A failed fetch serves the last cached
    /// verdict flagged stale, or the fail-closed default when nothing is
    /// cached.
    #[instrument(skip(self), fields(org_id = %org_id))]
    pub async fn check_org(&self, org_id: &OrgId) -> TrustLookup {
        let now = Utc::now();
        let cached = self.cached(org_id);

        if let Some(verdict) = &cached {
            if self.is_fresh(verdict, now) {
                debug!("trust verdict served from cache");
                return TrustLookup::fresh(verdict.clone(), VerdictSource::Cache);
            }
        }

        match self.fetch(org_id).await {
            Ok(verdict) => {
                self.cache.insert(org_id.clone(), verdict.clone());
                TrustLookup::fresh(verdict, VerdictSource::Fetched)
            }
            Err(err) => match cached {
                Some(verdict) => {
                    warn!(error = %err, "trust fetch failed, serving stale verdict");
                    TrustLookup::stale(verdict, VerdictSource::StaleCache)
                }
                None => {
                    warn!(error = %err, "trust fetch failed with nothing cached, failing closed");
                    TrustLookup::stale(
                        TrustVerdict::fail_closed(org_id.clone(), now),
                        VerdictSource::FailClosed,
                    )
                }
            },
        }
    }

    /// Seed or replace a cached verdict.
    pub fn prime(&self, verdict: TrustVerdict) {
        self.cache.insert(verdict.org_id.clone(), verdict);
    }

    pub fn invalidate(&self, org_id: &OrgId) -> Option<TrustVerdict> {
        self.cache.remove(org_id).map(|(_, verdict)| verdict)
    }

    pub fn cached(&self, org_id: &OrgId) -> Option<TrustVerdict> {
        self.cache.get(org_id).map(|entry| entry.value().clone())
    }

    pub fn cached_orgs(&self) -> usize {
        self.cache.len()
    }

    /// Re-fetch every cached organization. Failures keep the old entry.
    /// Returns how many entries were refreshed.
    pub async fn refresh_all(&self) -> usize {
        let orgs: Vec<OrgId> = self.cache.iter().map(|e| e.key().clone()).collect();
        let mut refreshed = 0;
        for org_id in orgs {
            match self.fetch(&org_id).await {
                Ok(verdict) => {
                    self.cache.insert(org_id, verdict);
                    refreshed += 1;
                }
                Err(err) => warn!(org_id = %org_id, error = %err, "trust refresh failed"),
            }
        }
        refreshed
    }

    /// Periodically run [`refresh_all`](Self::refresh_all) until the handle
    /// is aborted.
    pub fn spawn_refresh(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // first tick fires immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let refreshed = self.refresh_all().await;
                info!(refreshed, "trust cache refresh");
            }
        })
    }

    fn is_fresh(&self, verdict: &TrustVerdict, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(verdict.fetched_at) < self.config.ttl()
    }

    async fn fetch(&self, org_id: &OrgId) -> TrustResult<TrustVerdict> {
        let timeout = self.config.fetch_timeout();
        let mut verdict = tokio::time::timeout(timeout, self.source.fetch_trust_verdict(org_id))
            .await
            .map_err(|_| TrustError::Timeout(self.config.fetch_timeout_ms))??;
        verdict.org_id = org_id.clone();
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryTrustSource;
    use async_trait::async_trait;

    fn gate_with(source: Arc<InMemoryTrustSource>, config: TrustConfig) -> TrustGate {
        TrustGate::new(source, config)
    }

    fn source() -> Arc<InMemoryTrustSource> {
        Arc::new(InMemoryTrustSource::with_scores(
            TrustThresholds::default(),
            [("org-good", 90u8), ("org-bad", 10u8)],
        ))
    }

    #[tokio::test]
    async fn fresh_verdicts_come_from_cache() {
        let source = source();
        let gate = gate_with(source.clone(), TrustConfig::default());
        let org = OrgId::new("org-good");

        let first = gate.check_org(&org).await;
        let second = gate.check_org(&org).await;
        assert_eq!(first.source, VerdictSource::Fetched);
        assert_eq!(second.source, VerdictSource::Cache);
        assert!(!second.stale && second.verdict.verified);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn expired_verdict_is_refetched() {
        let source = source();
        let gate = gate_with(source.clone(), TrustConfig::default());
        let org = OrgId::new("org-good");
        gate.prime(TrustVerdict {
            org_id: org.clone(),
            score: 10,
            verified: false,
            dashboard_access: false,
            fetched_at: Utc::now() - chrono::Duration::hours(25),
        });

        let lookup = gate.check_org(&org).await;
        assert_eq!(lookup.source, VerdictSource::Fetched);
        assert!(lookup.verdict.verified);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_serves_stale_verdict() {
        let source = source();
        let gate = gate_with(source.clone(), TrustConfig::default());
        let org = OrgId::new("org-good");
        gate.prime(TrustVerdict {
            org_id: org.clone(),
            score: 90,
            verified: true,
            dashboard_access: true,
            fetched_at: Utc::now() - chrono::Duration::days(2),
        });
        source.set_unavailable(true);

        let lookup = gate.check_org(&org).await;
        assert!(lookup.stale);
        assert_eq!(lookup.source, VerdictSource::StaleCache);
        assert!(lookup.verdict.verified);
    }

    #[tokio::test]
    async fn nothing_cached_fails_closed() {
        let source = source();
        source.set_unavailable(true);
        let gate = gate_with(source, TrustConfig::default());

        let lookup = gate.check_org(&OrgId::new("org-good")).await;
        assert_eq!(lookup.source, VerdictSource::FailClosed);
        assert!(!lookup.verdict.verified);
        assert!(!lookup.verdict.dashboard_access);
        assert_eq!(gate.cached_orgs(), 0);
    }

    struct HangingSource;

    #[async_trait]
    impl TrustSource for HangingSource {
        async fn fetch_trust_verdict(&self, _org_id: &OrgId) -> TrustResult<TrustVerdict> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(TrustError::Unavailable("unreachable".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_times_out_and_fails_closed() {
        let gate = TrustGate::new(Arc::new(HangingSource), TrustConfig::default());
        let lookup = gate.check_org(&OrgId::new("org-slow")).await;
        assert_eq!(lookup.source, VerdictSource::FailClosed);
    }

    #[tokio::test]
    async fn refresh_all_updates_cached_entries() {
        let source = source();
        let gate = gate_with(source.clone(), TrustConfig::default());
        let org = OrgId::new("org-bad");
        assert!(!gate.check_org(&org).await.verdict.verified);

        source.set_score("org-bad", 95);
        assert_eq!(gate.refresh_all().await, 1);
        assert!(gate.cached(&org).unwrap().verified);

        source.set_unavailable(true);
        assert_eq!(gate.refresh_all().await, 0);
        assert!(gate.cached(&org).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_task_runs_on_interval() {
        let source = source();
        let gate = Arc::new(gate_with(source.clone(), TrustConfig::default()));
        gate.check_org(&OrgId::new("org-good")).await;
        assert_eq!(source.fetch_count(), 1);

        let handle = Arc::clone(&gate).spawn_refresh(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(125)).await;
        handle.abort();

        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let source = source();
        let gate = gate_with(source.clone(), TrustConfig::default());
        let org = OrgId::new("org-good");
        gate.check_org(&org).await;
        assert!(gate.invalidate(&org).is_some());
        gate.check_org(&org).await;
        assert_eq!(source.fetch_count(), 2);
    }
}
