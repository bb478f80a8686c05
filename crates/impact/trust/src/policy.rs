use chrono::{DateTime, Utc};
use impact_types::{OrgId, TrustLookup, TrustVerdict};
use serde::{Deserialize, Serialize};

/// Score cut-offs used to turn a raw reputation score into a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustThresholds {
    #[serde(default = "default_verified_min")]
    pub verified_min: u8,
    #[serde(default = "default_dashboard_min")]
    pub dashboard_min: u8,
}

impl Default for TrustThresholds {
    fn default() -> Self {
        Self {
            verified_min: default_verified_min(),
            dashboard_min: default_dashboard_min(),
        }
    }
}

fn default_verified_min() -> u8 {
    60
}

fn default_dashboard_min() -> u8 {
    75
}

impl TrustThresholds {
    pub fn verdict_for(&self, org_id: OrgId, score: u8, fetched_at: DateTime<Utc>) -> TrustVerdict {
        let score = score.min(100);
        TrustVerdict {
            org_id,
            score,
            verified: score >= self.verified_min,
            dashboard_access: score >= self.dashboard_min,
            fetched_at,
        }
    }
}

/// Who may finalize verifications.
///
/// Allowed iff the organization is verified, or it has dashboard access and
/// the request carries an explicit admin override. A stale lookup counts as
/// not verified unless `accept_stale` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustPolicy {
    #[serde(default = "default_allow_admin_override")]
    pub allow_admin_override: bool,

    #[serde(default)]
    pub accept_stale: bool,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            allow_admin_override: default_allow_admin_override(),
            accept_stale: false,
        }
    }
}

fn default_allow_admin_override() -> bool {
    true
}

impl TrustPolicy {
    pub fn permits(&self, verdict: &TrustVerdict, admin_override: bool) -> bool {
        verdict.verified
            || (self.allow_admin_override && admin_override && verdict.dashboard_access)
    }

    /// Human-readable reason when [`permits`](Self::permits) is false.
    pub fn denial_reason(&self, verdict: &TrustVerdict, admin_override: bool) -> Option<String> {
        if self.permits(verdict, admin_override) {
            return None;
        }
        let reason = if verdict.dashboard_access && !admin_override {
            format!(
                "organization {} is not verified (score {}); dashboard access requires an admin override",
                verdict.org_id, verdict.score
            )
        } else {
            format!(
                "organization {} is not verified (score {})",
                verdict.org_id, verdict.score
            )
        };
        Some(reason)
    }

    /// Like [`denial_reason`](Self::denial_reason), but also refuses verdicts
    /// served past their freshness window.
    pub fn assess(&self, lookup: &TrustLookup, admin_override: bool) -> Option<String> {
        if lookup.stale && !self.accept_stale {
            return Some(format!(
                "trust verdict for organization {} could not be refreshed",
                lookup.verdict.org_id
            ));
        }
        self.denial_reason(&lookup.verdict, admin_override)
    }
}
