use crate::{CauseId, MatchId, OrgId, ProofRecord, VolunteerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rejection reason recorded when the trust gate refuses a verifier.
pub const TRUST_DENIED_REASON: &str = "trust-denied";

/// Lifecycle status of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Interested,
    Verified,
    Rejected,
}

impl MatchStatus {
    /// Terminal states never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Verified | MatchStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Interested => "interested",
            MatchStatus::Verified => "verified",
            MatchStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interested" => Ok(MatchStatus::Interested),
            "verified" => Ok(MatchStatus::Verified),
            "rejected" => Ok(MatchStatus::Rejected),
            other => Err(format!("unknown match status '{}'", other)),
        }
    }
}

/// Why and by whom a match was refused.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub reason: String,
    pub rejected_by: OrgId,
    pub rejected_at: DateTime<Utc>,
}

/// A volunteer-cause pairing and its lifecycle.
///
/// Created as `interested`, mutated only by the verification ledger, never
/// deleted. At most one proof is ever attached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub match_id: MatchId,
    pub volunteer_id: VolunteerId,
    pub cause_id: CauseId,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<ProofRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
}

impl Match {
    /// A fresh `interested` match.
    pub fn new(volunteer_id: VolunteerId, cause_id: CauseId, created_at: DateTime<Utc>) -> Self {
        Self {
            match_id: MatchId::generate(),
            volunteer_id,
            cause_id,
            status: MatchStatus::Interested,
            created_at,
            updated_at: created_at,
            verified_at: None,
            proof: None,
            rejection: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == MatchStatus::Interested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_lowercase_names() {
        for status in [
            MatchStatus::Interested,
            MatchStatus::Verified,
            MatchStatus::Rejected,
        ] {
            let parsed: MatchStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("Verified ".parse::<MatchStatus>().is_ok());
        assert!("finalized".parse::<MatchStatus>().is_err());
    }

    #[test]
    fn only_interested_is_non_terminal() {
        assert!(!MatchStatus::Interested.is_terminal());
        assert!(MatchStatus::Verified.is_terminal());
        assert!(MatchStatus::Rejected.is_terminal());
    }

    #[test]
    fn new_match_starts_interested_without_proof() {
        let m = Match::new(VolunteerId::new("v-1"), CauseId::new("c-1"), Utc::now());
        assert!(m.is_pending());
        assert!(m.proof.is_none());
        assert!(m.verified_at.is_none());
        assert_eq!(m.created_at, m.updated_at);
    }
}
