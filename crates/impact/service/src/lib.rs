//! Impact Service - the engine facade and the `impactd` REST daemon.
//!
//! - [`ImpactEngine`]: ranking, match creation, verification and impact
//!   standing behind one cloneable handle
//! - REST API nested under `/api/v1`
//! - configuration layering and server lifecycle

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod server;

pub use config::EngineConfig;
pub use engine::ImpactEngine;
pub use error::{ApiError, DaemonError, EngineError};
pub use server::Server;
