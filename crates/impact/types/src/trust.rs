use crate::OrgId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// External reputation assessment of a cause-issuing organization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrustVerdict {
    pub org_id: OrgId,
    /// Reputation score in `[0, 100]`.
    pub score: u8,
    pub verified: bool,
    pub dashboard_access: bool,
    pub fetched_at: DateTime<Utc>,
}

impl TrustVerdict {
    /// The verdict used when nothing is known about an organization.
    pub fn fail_closed(org_id: OrgId, at: DateTime<Utc>) -> Self {
        Self {
            org_id,
            score: 0,
            verified: false,
            dashboard_access: false,
            fetched_at: at,
        }
    }
}

/// Where a verdict handed out by the trust gate came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    /// Cached and within its freshness window.
    Cache,
    /// Fetched from the reputation service during this lookup.
    Fetched,
    /// Refresh failed; last known verdict served past its window.
    StaleCache,
    /// Refresh failed and nothing was cached.
    FailClosed,
}

/// Result of a trust-gate lookup. `stale` is a warning, never an error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrustLookup {
    pub verdict: TrustVerdict,
    pub stale: bool,
    pub source: VerdictSource,
}

impl TrustLookup {
    pub fn fresh(verdict: TrustVerdict, source: VerdictSource) -> Self {
        Self {
            verdict,
            stale: false,
            source,
        }
    }

    pub fn stale(verdict: TrustVerdict, source: VerdictSource) -> Self {
        Self {
            verdict,
            stale: true,
            source,
        }
    }
}
