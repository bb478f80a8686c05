//! Impact Anchor - tamper evidence for proof records.
//!
//! A proof hash is handed to an external immutable ledger through an
//! [`AnchorTransport`]; the [`AnchoringAdapter`] validates the hash, retries
//! transient transport failures with bounded exponential backoff, and
//! surfaces everything else immediately.

#![deny(unsafe_code)]

mod adapter;
mod error;
mod transport;

pub use adapter::{AnchoringAdapter, RetryPolicy};
pub use error::{AnchorError, AnchorResult};
pub use transport::{AnchorTransport, HttpAnchorTransport, InMemoryAnchorTransport};
