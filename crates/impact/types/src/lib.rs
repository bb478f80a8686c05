//! Impact Types - the shared vocabulary of the matching and verification engine.
//!
//! Every crate in the workspace speaks in these types: volunteers and causes
//! flow into ranking, matches flow through the verification ledger, and proof
//! records come back from the external anchor.

#![deny(unsafe_code)]

mod catalog;
mod impact;
mod matching;
mod proof;
mod trust;

pub use catalog::{Cause, VolunteerProfile};
pub use impact::{Badge, ImpactStanding, POINTS_PER_VERIFICATION};
pub use matching::{Match, MatchStatus, Rejection, TRUST_DENIED_REASON};
pub use proof::{AnchorReceipt, ProofHash, ProofHashError, ProofRecord};
pub use trust::{TrustLookup, TrustVerdict, VerdictSource};

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identity of a volunteer account (owned by the account layer).
    VolunteerId
);
string_id!(
    /// Identity of a cause published by an NGO.
    CauseId
);
string_id!(
    /// Identity of a volunteer-cause pairing.
    MatchId
);
string_id!(
    /// Identity of a cause-issuing organization.
    OrgId
);
