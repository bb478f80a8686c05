//! Cause ranking for a single volunteer.

use crate::catalog::CauseCatalog;
use crate::error::RankingError;
use crate::geography::{normalize_city, GeographyTiers};
use dashmap::DashMap;
use impact_lexical::LexicalIndex;
use impact_types::{Cause, VolunteerId, VolunteerProfile};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Results returned when the caller does not ask for a specific count.
pub const DEFAULT_K: usize = 5;

/// Decimal digits kept on every reported score.
pub const DEFAULT_SCORE_PRECISION: u32 = 3;

/// Ranking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_k")]
    pub default_k: usize,

    #[serde(default = "default_score_precision")]
    pub score_precision: u32,

    /// Distinct candidate sets whose index is kept warm.
    #[serde(default = "default_index_cache_capacity")]
    pub index_cache_capacity: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            default_k: DEFAULT_K,
            score_precision: DEFAULT_SCORE_PRECISION,
            index_cache_capacity: default_index_cache_capacity(),
        }
    }
}

fn default_k() -> usize {
    DEFAULT_K
}

fn default_score_precision() -> u32 {
    DEFAULT_SCORE_PRECISION
}

fn default_index_cache_capacity() -> usize {
    64
}

/// One entry of a ranking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedCause {
    pub cause: Cause,
    /// tf-idf score rounded to the configured precision.
    pub score: f64,
    /// True when no cause was near the volunteer and the full corpus was used.
    pub geography_fallback: bool,
}

/// Causes eligible for a volunteer, in corpus order.
#[derive(Debug)]
pub struct Candidates<'a> {
    pub causes: Vec<&'a Cause>,
    pub fallback: bool,
}

/// Filter `corpus` down to causes in the volunteer's geography tier, or the
/// whole corpus when that filter leaves nothing.
pub fn select_candidates<'a>(
    volunteer: &VolunteerProfile,
    corpus: &'a [Cause],
    tiers: &GeographyTiers,
) -> Candidates<'a> {
    let nearby = tiers.nearby(&volunteer.city);
    let causes: Vec<&Cause> = corpus
        .iter()
        .filter(|c| nearby.contains(&normalize_city(&c.city)))
        .collect();

    if causes.is_empty() {
        Candidates {
            causes: corpus.iter().collect(),
            fallback: true,
        }
    } else {
        Candidates {
            causes,
            fallback: false,
        }
    }
}

/// Upper bound on reported digits; past it `f64` has nothing left to round.
pub const MAX_SCORE_PRECISION: u32 = 15;

/// Round to `precision` decimal digits, capped at [`MAX_SCORE_PRECISION`].
pub fn round_score(raw: f64, precision: u32) -> f64 {
    let precision = precision.min(MAX_SCORE_PRECISION);
    let factor = 10f64.powi(precision as i32);
    (raw * factor).round() / factor
}

/// Rank without a catalog or cache: build a fresh index over the candidates.
pub fn rank_candidates(
    volunteer: &VolunteerProfile,
    corpus: &[Cause],
    tiers: &GeographyTiers,
    k: usize,
) -> Vec<RankedCause> {
    let candidates = select_candidates(volunteer, corpus, tiers);
    let index = LexicalIndex::build(candidates.causes.iter().map(|c| c.description.as_str()));
    order_candidates(
        &volunteer.interests,
        &candidates,
        &index,
        k,
        DEFAULT_SCORE_PRECISION,
    )
}

/// Score, sort descending, truncate. Equal raw scores keep corpus order
/// because the sort is stable; rounding happens only on the way out.
fn order_candidates(
    interests: &str,
    candidates: &Candidates<'_>,
    index: &LexicalIndex,
    k: usize,
    precision: u32,
) -> Vec<RankedCause> {
    if k == 0 {
        return Vec::new();
    }

    top_k(index.score_all(interests), k, precision)
        .into_iter()
        .map(|(position, score)| RankedCause {
            cause: candidates.causes[position].clone(),
            score,
            geography_fallback: candidates.fallback,
        })
        .collect()
}

/// Corpus positions of the `k` best raw scores, each paired with its
/// rounded score.
fn top_k(raw_scores: Vec<f64>, k: usize, precision: u32) -> Vec<(usize, f64)> {
    let mut scored: Vec<(usize, f64)> = raw_scores.into_iter().enumerate().collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);
    scored
        .into_iter()
        .map(|(position, raw)| (position, round_score(raw, precision)))
        .collect()
}

/// Catalog-backed ranking engine with a per-candidate-set index cache.
pub struct RankingEngine {
    catalog: Arc<dyn CauseCatalog>,
    tiers: GeographyTiers,
    config: RankingConfig,
    index_cache: DashMap<String, Arc<LexicalIndex>>,
}

impl RankingEngine {
    pub fn new(
        catalog: Arc<dyn CauseCatalog>,
        tiers: GeographyTiers,
        mut config: RankingConfig,
    ) -> Self {
        if config.score_precision > MAX_SCORE_PRECISION {
            warn!(
                requested = config.score_precision,
                max = MAX_SCORE_PRECISION,
                "score precision clamped"
            );
            config.score_precision = MAX_SCORE_PRECISION;
        }
        Self {
            catalog,
            tiers,
            config,
            index_cache: DashMap::new(),
        }
    }

    pub fn tiers(&self) -> &GeographyTiers {
        &self.tiers
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub fn catalog(&self) -> Arc<dyn CauseCatalog> {
        Arc::clone(&self.catalog)
    }

    /// Number of candidate-set indexes currently cached.
    pub fn cached_indexes(&self) -> usize {
        self.index_cache.len()
    }

    /// Rank the current corpus for `volunteer`.
    #[instrument(skip(self, volunteer), fields(volunteer_id = %volunteer.volunteer_id, city = %volunteer.city))]
    pub async fn rank(
        &self,
        volunteer: &VolunteerProfile,
        k: usize,
    ) -> Result<Vec<RankedCause>, RankingError> {
        let corpus = self.catalog.list_causes().await?;
        let candidates = select_candidates(volunteer, &corpus, &self.tiers);
        if candidates.fallback && !corpus.is_empty() {
            debug!("no causes in geography tier, ranking full corpus");
        }

        let index = self.index_for(&candidates.causes);
        let ranked = order_candidates(
            &volunteer.interests,
            &candidates,
            &index,
            k,
            self.config.score_precision,
        );

        debug!(
            candidates = candidates.causes.len(),
            returned = ranked.len(),
            fallback = candidates.fallback,
            "ranked causes"
        );
        Ok(ranked)
    }

    /// Look the volunteer up in the catalog, then rank.
    pub async fn rank_volunteer(
        &self,
        volunteer_id: &VolunteerId,
        k: usize,
    ) -> Result<Vec<RankedCause>, RankingError> {
        let volunteer = self
            .catalog
            .get_volunteer(volunteer_id)
            .await?
            .ok_or_else(|| RankingError::VolunteerNotFound(volunteer_id.to_string()))?;
        self.rank(&volunteer, k).await
    }

    fn index_for(&self, candidates: &[&Cause]) -> Arc<LexicalIndex> {
        let key = fingerprint(candidates);
        if let Some(index) = self.index_cache.get(&key) {
            return Arc::clone(index.value());
        }

        let index = Arc::new(LexicalIndex::build(
            candidates.iter().map(|c| c.description.as_str()),
        ));
        if self.index_cache.len() >= self.config.index_cache_capacity.max(1) {
            self.index_cache.clear();
        }
        self.index_cache.insert(key, Arc::clone(&index));
        index
    }
}

/// Content fingerprint of a candidate set; any edit to ids, order or
/// descriptions produces a new key.
fn fingerprint(candidates: &[&Cause]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(candidates.len() as u64).to_le_bytes());
    for cause in candidates {
        for field in [cause.cause_id.as_str(), cause.description.as_str()] {
            hasher.update(&(field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
