//! The engine facade: ranking, match creation and verification behind one
//! handle, wired from [`EngineConfig`].

use crate::config::EngineConfig;
use crate::error::{DaemonError, DaemonResult, EngineError, EngineResult};
use chrono::Utc;
use impact_anchor::{AnchorTransport, AnchoringAdapter, HttpAnchorTransport, InMemoryAnchorTransport};
use impact_ledger::{VerificationLedger, VerifyRequest};
use impact_ranking::{CauseCatalog, InMemoryCatalog, RankedCause, RankingEngine};
use impact_storage::{
    verify_attempt_chain, ImpactStorage, InMemoryMatchStore, QueryWindow, VerificationAttempt,
};
use impact_trust::{HttpTrustSource, InMemoryTrustSource, TrustGate, TrustSource};
use impact_types::{
    CauseId, ImpactStanding, Match, MatchId, MatchStatus, OrgId, ProofRecord, VolunteerId,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Matching and verification engine.
///
/// Cheap to clone; every part is shared.
#[derive(Clone)]
pub struct ImpactEngine {
    catalog: Arc<dyn CauseCatalog>,
    ranking: Arc<RankingEngine>,
    ledger: VerificationLedger,
}

impl ImpactEngine {
    /// Assemble an engine from already-built parts.
    pub fn from_parts(ranking: RankingEngine, ledger: VerificationLedger) -> Self {
        Self {
            catalog: ranking.catalog(),
            ranking: Arc::new(ranking),
            ledger,
        }
    }

    /// Build every collaborator from configuration.
    ///
    /// Without endpoints the trust source and the anchor ledger run in
    /// process, which is what local runs and tests use.
    pub async fn bootstrap(config: &EngineConfig) -> DaemonResult<Self> {
        let catalog = match &config.catalog.seed_path {
            Some(path) => {
                let catalog = InMemoryCatalog::load_json(path)?;
                info!(path = %path, "catalog seeded");
                catalog
            }
            None => InMemoryCatalog::new(),
        };
        let catalog: Arc<dyn CauseCatalog> = Arc::new(catalog);

        let causes = catalog.list_causes().await?;
        let mut tiers = config.geography.clone().unwrap_or_default();
        let added = tiers.ensure_covers(&causes);
        if !added.is_empty() {
            warn!(cities = ?added, "cause cities missing from geography table, added as singletons");
        }
        let ranking = RankingEngine::new(catalog, tiers, config.ranking.clone());

        let trust_source: Arc<dyn TrustSource> = match &config.trust.endpoint {
            Some(endpoint) => Arc::new(
                HttpTrustSource::new(
                    endpoint,
                    config.trust.fetch_timeout(),
                    config.trust.thresholds,
                )
                .map_err(|e| DaemonError::Bootstrap(format!("trust source: {}", e)))?,
            ),
            None => Arc::new(InMemoryTrustSource::with_scores(
                config.trust.thresholds,
                config
                    .trust_scores
                    .iter()
                    .map(|(org, score)| (org.as_str(), *score)),
            )),
        };
        let trust = Arc::new(TrustGate::new(trust_source, config.trust.clone()));

        let request_timeout = config.anchoring.request_timeout();
        let transport: Arc<dyn AnchorTransport> = match &config.anchoring.endpoint {
            Some(endpoint) => Arc::new(
                HttpAnchorTransport::new(endpoint, request_timeout)
                .map_err(|e| DaemonError::Bootstrap(format!("anchor transport: {}", e)))?,
            ),
            None => Arc::new(InMemoryAnchorTransport::new()),
        };
        let anchor = Arc::new(
            AnchoringAdapter::new(transport, config.anchoring.retry.clone())
                .with_request_timeout(request_timeout),
        );

        let store: Arc<dyn ImpactStorage> = Arc::new(InMemoryMatchStore::new());
        let ledger =
            VerificationLedger::new(store, trust, anchor).with_config(config.ledger.clone());
        if ledger.anchor_deadline() > config.ledger.anchor_timeout() {
            warn!(
                configured_ms = config.ledger.anchor_timeout_ms,
                effective_ms = ledger.anchor_deadline().as_millis() as u64,
                "anchor timeout shorter than the retry budget, raised"
            );
        }

        info!(
            causes = causes.len(),
            remote_trust = config.trust.endpoint.is_some(),
            remote_anchor = config.anchoring.endpoint.is_some(),
            "engine bootstrapped"
        );
        Ok(Self::from_parts(ranking, ledger))
    }

    pub fn ranking(&self) -> &RankingEngine {
        &self.ranking
    }

    pub fn ledger(&self) -> &VerificationLedger {
        &self.ledger
    }

    /// Top `k` causes for a volunteer; `None` uses the configured default.
    pub async fn rank(
        &self,
        volunteer_id: &VolunteerId,
        k: Option<usize>,
    ) -> EngineResult<Vec<RankedCause>> {
        let k = k.unwrap_or(self.ranking.config().default_k);
        Ok(self.ranking.rank_volunteer(volunteer_id, k).await?)
    }

    /// Record a volunteer's interest in a cause. Repeating the call returns
    /// the same match.
    #[instrument(skip(self), fields(volunteer_id = %volunteer_id, cause_id = %cause_id))]
    pub async fn create_match(
        &self,
        volunteer_id: &VolunteerId,
        cause_id: &CauseId,
    ) -> EngineResult<Match> {
        self.require_volunteer(volunteer_id).await?;
        if self.catalog.get_cause(cause_id).await?.is_none() {
            return Err(EngineError::NotFound(format!("Cause {} not found", cause_id)));
        }

        let created = self
            .ledger
            .store()
            .create(volunteer_id.clone(), cause_id.clone(), Utc::now())
            .await?;
        info!(match_id = %created.match_id, status = %created.status, "match recorded");
        Ok(created)
    }

    pub async fn verify(&self, request: VerifyRequest) -> EngineResult<ProofRecord> {
        Ok(self.ledger.verify_request(request).await?)
    }

    pub async fn deny(
        &self,
        match_id: &MatchId,
        verifier_org: &OrgId,
        reason: &str,
    ) -> EngineResult<Match> {
        Ok(self.ledger.deny(match_id, verifier_org, reason).await?)
    }

    pub async fn get_match(&self, match_id: &MatchId) -> EngineResult<Match> {
        self.ledger
            .store()
            .get(match_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Match {} not found", match_id)))
    }

    /// Matches still waiting on a verifier, oldest first.
    pub async fn pending_for(&self, volunteer_id: &VolunteerId) -> EngineResult<Vec<Match>> {
        self.require_volunteer(volunteer_id).await?;
        Ok(self
            .ledger
            .store()
            .list_by_volunteer(volunteer_id, Some(MatchStatus::Interested))
            .await?)
    }

    pub async fn impact_standing(&self, volunteer_id: &VolunteerId) -> EngineResult<ImpactStanding> {
        self.require_volunteer(volunteer_id).await?;
        let matches = self
            .ledger
            .store()
            .list_by_volunteer(volunteer_id, None)
            .await?;
        Ok(ImpactStanding::from_matches(volunteer_id.clone(), &matches))
    }

    /// Verification audit, newest first.
    pub async fn attempts(&self, window: QueryWindow) -> EngineResult<Vec<VerificationAttempt>> {
        Ok(self.ledger.store().list_attempts(window).await?)
    }

    /// Recompute the whole audit chain.
    pub async fn audit_chain_intact(&self) -> EngineResult<bool> {
        let mut chain = self
            .ledger
            .store()
            .list_attempts(QueryWindow::default())
            .await?;
        chain.reverse();
        Ok(verify_attempt_chain(&chain)?)
    }

    async fn require_volunteer(&self, volunteer_id: &VolunteerId) -> EngineResult<()> {
        match self.catalog.get_volunteer(volunteer_id).await? {
            Some(_) => Ok(()),
            None => Err(EngineError::NotFound(format!(
                "Volunteer {} not found",
                volunteer_id
            ))),
        }
    }

    /// Start the trust refresh loop when an interval is configured.
    pub fn start_background(&self) -> Option<JoinHandle<()>> {
        let gate = self.ledger.trust_gate();
        let secs = gate.config().refresh_interval_secs;
        if secs == 0 {
            return None;
        }
        info!(interval_secs = secs, "starting trust refresh task");
        Some(gate.spawn_refresh(Duration::from_secs(secs)))
    }
}
