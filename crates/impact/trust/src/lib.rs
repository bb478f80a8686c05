//! Impact Trust - decides whether an organization may finalize verifications.
//!
//! Verdicts come from an external reputation collaborator through
//! [`TrustSource`] and are cached per organization by [`TrustGate`]. A lookup
//! never errors: a failed refresh serves the last known verdict flagged
//! stale, and an organization with no history fails closed.

#![deny(unsafe_code)]

mod error;
mod gate;
mod policy;
mod source;

pub use error::{TrustError, TrustResult};
pub use gate::{TrustConfig, TrustGate};
pub use policy::{TrustPolicy, TrustThresholds};
pub use source::{HttpTrustSource, InMemoryTrustSource, TrustSource};
