use crate::model::{AttemptAppend, TransitionRequest, VerificationAttempt};
use crate::StorageResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use impact_types::{CauseId, Match, MatchId, MatchStatus, VolunteerId};

/// Generic query window for paged reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

/// Lifecycle storage for matches.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Record interest. Returns the existing match unchanged when the
    /// (volunteer, cause) pair is already recorded.
    async fn create(
        &self,
        volunteer_id: VolunteerId,
        cause_id: CauseId,
        created_at: DateTime<Utc>,
    ) -> StorageResult<Match>;

    /// Compare-and-swap on the current status. Only `interested` records move.
    async fn transition(&self, match_id: &MatchId, request: TransitionRequest)
        -> StorageResult<Match>;

    async fn get(&self, match_id: &MatchId) -> StorageResult<Option<Match>>;

    async fn find_by_pair(
        &self,
        volunteer_id: &VolunteerId,
        cause_id: &CauseId,
    ) -> StorageResult<Option<Match>>;

    /// A volunteer's matches oldest-first, optionally filtered by status.
    async fn list_by_volunteer(
        &self,
        volunteer_id: &VolunteerId,
        status: Option<MatchStatus>,
    ) -> StorageResult<Vec<Match>>;

    /// All matches newest-first.
    async fn list(&self, window: QueryWindow) -> StorageResult<Vec<Match>>;
}

/// Append-only audit of verification outcomes.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Append an attempt and return the hash-linked stored record.
    async fn append_attempt(&self, event: AttemptAppend) -> StorageResult<VerificationAttempt>;

    /// Read attempts newest-first.
    async fn list_attempts(&self, window: QueryWindow) -> StorageResult<Vec<VerificationAttempt>>;

    async fn latest_attempt_hash(&self) -> StorageResult<Option<String>>;
}

/// Storage bundle used by the verification ledger.
pub trait ImpactStorage: MatchStore + AttemptStore + Send + Sync {}

impl<T> ImpactStorage for T where T: MatchStore + AttemptStore + Send + Sync {}
