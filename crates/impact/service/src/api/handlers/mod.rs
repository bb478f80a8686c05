//! API request handlers

mod health;
mod matches;
mod verifications;
mod volunteers;

pub use health::*;
pub use matches::*;
pub use verifications::*;
pub use volunteers::*;
