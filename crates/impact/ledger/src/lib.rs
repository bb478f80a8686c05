//! Impact Ledger - the verification state machine.
//!
//! A verification request passes the trust gate, gets a fresh content hash,
//! is anchored externally, and is finalized with a compare-and-swap on the
//! match store. The store is the linearization point: however many callers
//! race on one match, exactly one proof is ever attached to it.

#![deny(unsafe_code)]

mod error;
mod ledger;
mod proof;
mod stage;

pub use error::VerificationError;
pub use ledger::{
    LedgerConfig, VerificationLedger, VerifyRequest, ANCHOR_DEADLINE_SLACK, DEFAULT_DENIAL_REASON,
};
pub use proof::compute_proof_hash;
pub use stage::{StageError, VerificationStage};
