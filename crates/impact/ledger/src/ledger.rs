use crate::error::VerificationError;
use crate::proof::compute_proof_hash;
use crate::stage::VerificationStage;
use chrono::Utc;
use impact_anchor::AnchoringAdapter;
use impact_storage::{AttemptAppend, ImpactStorage, StorageError, TransitionRequest};
use impact_trust::{TrustGate, TrustPolicy};
use impact_types::{
    Match, MatchId, MatchStatus, OrgId, ProofHash, ProofRecord, TRUST_DENIED_REASON,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Reason recorded when `deny` is called without one.
pub const DEFAULT_DENIAL_REASON: &str = "denied-by-verifier";

/// Headroom kept above the adapter's worst case.
pub const ANCHOR_DEADLINE_SLACK: Duration = Duration::from_secs(1);

/// Verification ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Bound on one anchoring round, retries included. Raised to the
    /// adapter's worst case plus [`ANCHOR_DEADLINE_SLACK`] when that is longer.
    #[serde(default = "default_anchor_timeout_ms")]
    pub anchor_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            anchor_timeout_ms: default_anchor_timeout_ms(),
        }
    }
}

fn default_anchor_timeout_ms() -> u64 {
    30_000
}

impl LedgerConfig {
    pub fn anchor_timeout(&self) -> Duration {
        Duration::from_millis(self.anchor_timeout_ms)
    }
}

/// A verification request from an NGO actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub match_id: MatchId,
    pub verifier_org: OrgId,
    /// Lets an organization with dashboard access but no full verification
    /// finalize proofs.
    #[serde(default)]
    pub admin_override: bool,
}

/// Drives matches from `interested` to a terminal state.
///
/// Cheap to clone; all parts are shared.
#[derive(Clone)]
pub struct VerificationLedger {
    store: Arc<dyn ImpactStorage>,
    trust: Arc<TrustGate>,
    policy: TrustPolicy,
    anchor: Arc<AnchoringAdapter>,
    config: LedgerConfig,
}

impl VerificationLedger {
    pub fn new(
        store: Arc<dyn ImpactStorage>,
        trust: Arc<TrustGate>,
        anchor: Arc<AnchoringAdapter>,
    ) -> Self {
        Self {
            store,
            trust,
            policy: TrustPolicy::default(),
            anchor,
            config: LedgerConfig::default(),
        }
    }

    pub fn with_policy(mut self, policy: TrustPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> Arc<dyn ImpactStorage> {
        Arc::clone(&self.store)
    }

    pub fn trust_gate(&self) -> Arc<TrustGate> {
        Arc::clone(&self.trust)
    }

    /// How long an anchoring round may run before it is abandoned.
    ///
    /// Never shorter than the adapter's own worst case, so a submission the
    /// adapter is still allowed to make cannot land after the match was
    /// given up on.
    pub fn anchor_deadline(&self) -> Duration {
        let configured = self.config.anchor_timeout();
        match self.anchor.worst_case() {
            Some(worst) => configured.max(worst + ANCHOR_DEADLINE_SLACK),
            None => configured,
        }
    }

    /// Verify without an admin override.
    pub async fn verify(
        &self,
        match_id: &MatchId,
        verifier_org: &OrgId,
    ) -> Result<ProofRecord, VerificationError> {
        self.verify_request(VerifyRequest {
            match_id: match_id.clone(),
            verifier_org: verifier_org.clone(),
            admin_override: false,
        })
        .await
    }

    /// Issue the proof for a match, or explain why not.
    ///
    /// Dropping the returned future before the trust check completes has no
    /// effect. After that point hashing, anchoring and finalization run on a
    /// detached task and always complete or record their failure.
    #[instrument(
        skip(self, request),
        fields(match_id = %request.match_id, org_id = %request.verifier_org)
    )]
    pub async fn verify_request(
        &self,
        request: VerifyRequest,
    ) -> Result<ProofRecord, VerificationError> {
        let stage = VerificationStage::Requested;

        let current = self.load(&request.match_id).await?;
        if current.status != MatchStatus::Interested {
            return Err(VerificationError::AlreadyFinalized {
                match_id: current.match_id,
                status: current.status,
            });
        }

        let lookup = self.trust.check_org(&request.verifier_org).await;
        if lookup.stale {
            warn!(source = ?lookup.source, "trust verdict is stale");
        }
        let stage = stage.advance(VerificationStage::TrustChecked)?;

        if let Some(reason) = self.policy.assess(&lookup, request.admin_override) {
            return Err(self
                .reject_untrusted(&current, &request.verifier_org, stage, reason)
                .await);
        }

        let ledger = self.clone();
        let org = request.verifier_org.clone();
        tokio::spawn(async move { ledger.anchor_and_finalize(current, org, stage).await })
            .await
            .map_err(|e| VerificationError::Internal(format!("finalize task failed: {}", e)))?
    }

    /// Refuse a match. No trust check; repeating it is a no-op.
    #[instrument(skip(self, reason), fields(match_id = %match_id, org_id = %verifier_org))]
    pub async fn deny(
        &self,
        match_id: &MatchId,
        verifier_org: &OrgId,
        reason: &str,
    ) -> Result<Match, VerificationError> {
        let current = self.load(match_id).await?;
        let status = current.status;
        match status {
            MatchStatus::Rejected => {
                debug!("match already rejected");
                return Ok(current);
            }
            MatchStatus::Verified => {
                return Err(VerificationError::AlreadyFinalized {
                    match_id: current.match_id,
                    status: current.status,
                })
            }
            MatchStatus::Interested => {}
        }

        let reason = match reason.trim() {
            "" => DEFAULT_DENIAL_REASON,
            trimmed => trimmed,
        };
        let request = TransitionRequest::reject(reason, verifier_org.clone(), Utc::now());
        match self.store.transition(match_id, request).await {
            Ok(rejected) => {
                info!(reason, "match denied");
                self.record_attempt(
                    match_id,
                    Some(verifier_org),
                    VerificationStage::Failed,
                    false,
                    format!("denied: {}", reason),
                    None,
                )
                .await;
                Ok(rejected)
            }
            Err(StorageError::AlreadyFinalized {
                current: MatchStatus::Rejected,
            }) => self.load(match_id).await,
            Err(err) => Err(VerificationError::from_storage(match_id, err)),
        }
    }

    async fn reject_untrusted(
        &self,
        current: &Match,
        verifier_org: &OrgId,
        stage: VerificationStage,
        reason: String,
    ) -> VerificationError {
        let stage = match stage.advance(VerificationStage::Failed) {
            Ok(stage) => stage,
            Err(err) => return err.into(),
        };
        let request = TransitionRequest::reject(TRUST_DENIED_REASON, verifier_org.clone(), Utc::now());
        if let Err(err) = self.store.transition(&current.match_id, request).await {
            warn!(error = %err, "could not record trust denial on match");
        }
        warn!(reason = %reason, "verification denied by trust gate");
        self.record_attempt(
            &current.match_id,
            Some(verifier_org),
            stage,
            false,
            format!("{}: {}", TRUST_DENIED_REASON, reason),
            None,
        )
        .await;
        VerificationError::TrustDenied {
            org_id: verifier_org.clone(),
            reason,
        }
    }

    async fn anchor_and_finalize(
        &self,
        current: Match,
        verifier_org: OrgId,
        stage: VerificationStage,
    ) -> Result<ProofRecord, VerificationError> {
        let match_id = current.match_id.clone();
        let issued_at = Utc::now();
        let hash = compute_proof_hash(&current.volunteer_id, &current.cause_id, issued_at);
        let stage = stage.advance(VerificationStage::Anchoring)?;
        debug!(hash = %hash, "anchoring proof");

        let deadline = self.anchor_deadline();
        let submitted = tokio::time::timeout(deadline, self.anchor.submit_hash(&hash)).await;
        let receipt = match submitted {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(err)) => {
                let failure = if err.is_transient() {
                    VerificationError::RetriableAnchorFailure(err.to_string())
                } else {
                    VerificationError::AnchorRejected(err.to_string())
                };
                self.anchor_failed(&match_id, &verifier_org, stage, &hash, &failure)
                    .await?;
                return Err(failure);
            }
            Err(_) => {
                let failure = VerificationError::RetriableAnchorFailure(format!(
                    "abandoned after {}ms without confirmation",
                    deadline.as_millis()
                ));
                self.anchor_failed(&match_id, &verifier_org, stage, &hash, &failure)
                    .await?;
                return Err(failure);
            }
        };

        let proof = ProofRecord::from_receipt(
            match_id.clone(),
            hash.clone(),
            issued_at,
            verifier_org.clone(),
            receipt,
        );
        let finalized = self
            .store
            .transition(&match_id, TransitionRequest::verify(proof.clone(), Utc::now()))
            .await;

        match finalized {
            Ok(_) => {
                let stage = stage.advance(VerificationStage::Finalized)?;
                info!(reference = %proof.anchor_reference, "proof finalized");
                self.record_attempt(
                    &match_id,
                    Some(&verifier_org),
                    stage,
                    true,
                    format!("anchored as {}", proof.anchor_reference),
                    Some(&hash),
                )
                .await;
                Ok(proof)
            }
            Err(StorageError::AlreadyFinalized { .. }) => {
                let winner = self.load(&match_id).await?;
                let stage = stage.advance(VerificationStage::Failed)?;
                self.record_attempt(
                    &match_id,
                    Some(&verifier_org),
                    stage,
                    false,
                    format!(
                        "lost finalization race, receipt {} discarded",
                        proof.anchor_reference
                    ),
                    Some(&hash),
                )
                .await;
                match winner.proof {
                    Some(winning) => {
                        info!(reference = %winning.anchor_reference, "returning winning proof");
                        Ok(winning)
                    }
                    None => Err(VerificationError::AlreadyFinalized {
                        match_id,
                        status: winner.status,
                    }),
                }
            }
            Err(err) => Err(VerificationError::from_storage(&match_id, err)),
        }
    }

    async fn anchor_failed(
        &self,
        match_id: &MatchId,
        verifier_org: &OrgId,
        stage: VerificationStage,
        hash: &ProofHash,
        failure: &VerificationError,
    ) -> Result<(), VerificationError> {
        let stage = stage.advance(VerificationStage::Failed)?;
        warn!(error = %failure, hash = %hash, "anchoring failed, match left interested");
        self.record_attempt(
            match_id,
            Some(verifier_org),
            stage,
            false,
            failure.to_string(),
            Some(hash),
        )
        .await;
        Ok(())
    }

    async fn load(&self, match_id: &MatchId) -> Result<Match, VerificationError> {
        self.store
            .get(match_id)
            .await
            .map_err(|e| VerificationError::from_storage(match_id, e))?
            .ok_or_else(|| VerificationError::NotFound(format!("match {} not found", match_id)))
    }

    /// Audit failures are logged, never surfaced.
    async fn record_attempt(
        &self,
        match_id: &MatchId,
        org_id: Option<&OrgId>,
        stage: VerificationStage,
        success: bool,
        message: String,
        proof_hash: Option<&ProofHash>,
    ) {
        let event = AttemptAppend {
            timestamp: Utc::now(),
            match_id: match_id.clone(),
            org_id: org_id.cloned(),
            stage: stage.as_str().to_string(),
            success,
            message,
            proof_hash: proof_hash.map(|h| h.as_str().to_string()),
        };
        if let Err(err) = self.store.append_attempt(event).await {
            warn!(error = %err, "failed to append verification attempt");
        }
    }
}
