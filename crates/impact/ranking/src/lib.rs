//! Impact Ranking - selects and orders causes for a volunteer.
//!
//! Geography is a preference, not a constraint: causes in the volunteer's
//! tier of nearby cities are ranked first-class, and only when that tier has
//! nothing does the whole corpus get ranked instead.

#![deny(unsafe_code)]

mod catalog;
mod engine;
mod error;
mod geography;

pub use catalog::{CatalogSeed, CauseCatalog, InMemoryCatalog};
pub use engine::{
    rank_candidates, round_score, select_candidates, Candidates, RankedCause, RankingConfig,
    RankingEngine, DEFAULT_K, DEFAULT_SCORE_PRECISION, MAX_SCORE_PRECISION,
};
pub use error::{CatalogError, RankingError};
pub use geography::{normalize_city, GeographyTiers};
