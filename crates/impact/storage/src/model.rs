use crate::{StorageError, StorageResult};
use chrono::{DateTime, Utc};
use impact_types::{MatchId, MatchStatus, OrgId, ProofRecord, Rejection};
use serde::{Deserialize, Serialize};

/// A requested lifecycle move, validated and applied atomically by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub to: MatchStatus,
    pub proof: Option<ProofRecord>,
    pub rejection: Option<Rejection>,
    pub at: DateTime<Utc>,
}

impl TransitionRequest {
    /// `interested → verified` carrying the proof to attach.
    pub fn verify(proof: ProofRecord, at: DateTime<Utc>) -> Self {
        Self {
            to: MatchStatus::Verified,
            proof: Some(proof),
            rejection: None,
            at,
        }
    }

    /// `interested → rejected`.
    pub fn reject(reason: impl Into<String>, rejected_by: OrgId, at: DateTime<Utc>) -> Self {
        Self {
            to: MatchStatus::Rejected,
            proof: None,
            rejection: Some(Rejection {
                reason: reason.into(),
                rejected_by,
                rejected_at: at,
            }),
            at,
        }
    }
}

/// Verification attempt payload. Hashes and sequencing are assigned by storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptAppend {
    pub timestamp: DateTime<Utc>,
    pub match_id: MatchId,
    pub org_id: Option<OrgId>,
    pub stage: String,
    pub success: bool,
    pub message: String,
    pub proof_hash: Option<String>,
}

/// Stored, hash-linked verification attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationAttempt {
    pub attempt_id: String,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub match_id: MatchId,
    pub org_id: Option<OrgId>,
    pub stage: String,
    pub success: bool,
    pub message: String,
    pub proof_hash: Option<String>,
    pub previous_hash: Option<String>,
    pub hash: String,
}

pub(crate) fn compute_attempt_hash(
    event: &AttemptAppend,
    previous_hash: Option<&str>,
    sequence: u64,
) -> StorageResult<String> {
    let serializable = serde_json::json!({
        "previous_hash": previous_hash,
        "sequence": sequence,
        "timestamp": event.timestamp,
        "match_id": event.match_id,
        "org_id": event.org_id,
        "stage": event.stage,
        "success": event.success,
        "message": event.message,
        "proof_hash": event.proof_hash,
    });
    let serialized =
        serde_json::to_vec(&serializable).map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(blake3::hash(&serialized).to_hex().to_string())
}

/// Recompute every link of a chain given in ascending sequence order.
///
/// Returns `Ok(false)` on the first record whose hash or back-link does not
/// match.
pub fn verify_attempt_chain(records: &[VerificationAttempt]) -> StorageResult<bool> {
    let mut previous: Option<&str> = None;
    for record in records {
        if record.previous_hash.as_deref() != previous {
            return Ok(false);
        }
        let event = AttemptAppend {
            timestamp: record.timestamp,
            match_id: record.match_id.clone(),
            org_id: record.org_id.clone(),
            stage: record.stage.clone(),
            success: record.success,
            message: record.message.clone(),
            proof_hash: record.proof_hash.clone(),
        };
        if compute_attempt_hash(&event, previous, record.sequence)? != record.hash {
            return Ok(false);
        }
        previous = Some(record.hash.as_str());
    }
    Ok(true)
}
