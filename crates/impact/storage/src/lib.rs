//! Impact storage abstractions.
//!
//! - match lifecycle records (system of record for verification state)
//! - an append-only, hash-linked audit of verification attempts
//!
//! The match store is the only component that needs transactional
//! discipline: every lifecycle move is a compare-and-swap on the current
//! status.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
mod model;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryMatchStore;
pub use model::{verify_attempt_chain, AttemptAppend, TransitionRequest, VerificationAttempt};
pub use traits::{AttemptStore, ImpactStorage, MatchStore, QueryWindow};
