use crate::{Match, MatchStatus, VolunteerId};
use serde::{Deserialize, Serialize};

/// Impact points awarded per verified match.
pub const POINTS_PER_VERIFICATION: u32 = 20;

/// Recognition tier earned from accumulated impact points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Badge {
    Bronze,
    Silver,
    Gold,
}

impl Badge {
    pub fn for_score(score: u32) -> Option<Badge> {
        match score {
            s if s >= 200 => Some(Badge::Gold),
            s if s >= 100 => Some(Badge::Silver),
            s if s >= 50 => Some(Badge::Bronze),
            _ => None,
        }
    }
}

/// A volunteer's standing, derived from their verified matches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactStanding {
    pub volunteer_id: VolunteerId,
    pub verified_matches: u32,
    pub pending_matches: u32,
    pub impact_score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<Badge>,
}

impl ImpactStanding {
    /// Tally the matches that belong to `volunteer_id`; others are ignored.
    pub fn from_matches<'a>(
        volunteer_id: VolunteerId,
        matches: impl IntoIterator<Item = &'a Match>,
    ) -> Self {
        let mut verified = 0u32;
        let mut pending = 0u32;
        for m in matches
            .into_iter()
            .filter(|m| m.volunteer_id == volunteer_id)
        {
            match m.status {
                MatchStatus::Verified => verified += 1,
                MatchStatus::Interested => pending += 1,
                MatchStatus::Rejected => {}
            }
        }

        let impact_score = verified.saturating_mul(POINTS_PER_VERIFICATION);
        Self {
            volunteer_id,
            verified_matches: verified,
            pending_matches: pending,
            impact_score,
            badge: Badge::for_score(impact_score),
        }
    }
}
