use crate::{CauseId, OrgId, VolunteerId};
use serde::{Deserialize, Serialize};

/// A volunteer as seen by the ranking engine.
///
/// Owned by the account layer; read-only for the duration of a ranking call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolunteerProfile {
    pub volunteer_id: VolunteerId,
    /// Free-text interest description, e.g. "plant trees, teach kids".
    #[serde(default)]
    pub interests: String,
    /// Home city label.
    pub city: String,
}

impl VolunteerProfile {
    pub fn new(
        volunteer_id: impl Into<VolunteerId>,
        interests: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        Self {
            volunteer_id: volunteer_id.into(),
            interests: interests.into(),
            city: city.into(),
        }
    }
}

/// A cause published by an NGO.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cause {
    pub cause_id: CauseId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub city: String,
    pub org_id: OrgId,
}

impl Cause {
    pub fn new(
        cause_id: impl Into<CauseId>,
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        city: impl Into<String>,
        org_id: impl Into<OrgId>,
    ) -> Self {
        Self {
            cause_id: cause_id.into(),
            name: name.into(),
            description: description.into(),
            category: category.into(),
            city: city.into(),
            org_id: org_id.into(),
        }
    }
}
