//! In-memory reference implementation of the storage traits.
//!
//! Deterministic and test-friendly. Each transition takes the write lock for
//! the whole check-and-write, which is what makes it a compare-and-swap.

use crate::model::{compute_attempt_hash, AttemptAppend, TransitionRequest, VerificationAttempt};
use crate::traits::{AttemptStore, MatchStore, QueryWindow};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use impact_types::{CauseId, Match, MatchId, MatchStatus, VolunteerId};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MatchTable {
    records: HashMap<MatchId, Match>,
    by_pair: HashMap<(VolunteerId, CauseId), MatchId>,
}

/// In-memory match and attempt storage.
#[derive(Default)]
pub struct InMemoryMatchStore {
    matches: RwLock<MatchTable>,
    attempts: RwLock<Vec<VerificationAttempt>>,
}

impl InMemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MatchStore for InMemoryMatchStore {
    async fn create(
        &self,
        volunteer_id: VolunteerId,
        cause_id: CauseId,
        created_at: DateTime<Utc>,
    ) -> StorageResult<Match> {
        let mut guard = self
            .matches
            .write()
            .map_err(|_| StorageError::Backend("matches lock poisoned".to_string()))?;

        let key = (volunteer_id, cause_id);
        if let Some(existing) = guard
            .by_pair
            .get(&key)
            .and_then(|id| guard.records.get(id))
        {
            return Ok(existing.clone());
        }

        let (volunteer_id, cause_id) = key;
        let record = Match::new(volunteer_id.clone(), cause_id.clone(), created_at);
        guard
            .by_pair
            .insert((volunteer_id, cause_id), record.match_id.clone());
        guard.records.insert(record.match_id.clone(), record.clone());
        Ok(record)
    }

    async fn transition(
        &self,
        match_id: &MatchId,
        request: TransitionRequest,
    ) -> StorageResult<Match> {
        let mut guard = self
            .matches
            .write()
            .map_err(|_| StorageError::Backend("matches lock poisoned".to_string()))?;
        let record = guard
            .records
            .get_mut(match_id)
            .ok_or_else(|| StorageError::NotFound(format!("match {} not found", match_id)))?;

        validate_request(match_id, &request)?;
        if record.status.is_terminal() {
            return Err(StorageError::AlreadyFinalized {
                current: record.status,
            });
        }

        record.status = request.to;
        record.updated_at = request.at;
        match request.to {
            MatchStatus::Verified => {
                record.verified_at = Some(request.at);
                record.proof = request.proof;
            }
            MatchStatus::Rejected => record.rejection = request.rejection,
            MatchStatus::Interested => {}
        }
        Ok(record.clone())
    }

    async fn get(&self, match_id: &MatchId) -> StorageResult<Option<Match>> {
        let guard = self
            .matches
            .read()
            .map_err(|_| StorageError::Backend("matches lock poisoned".to_string()))?;
        Ok(guard.records.get(match_id).cloned())
    }

    async fn find_by_pair(
        &self,
        volunteer_id: &VolunteerId,
        cause_id: &CauseId,
    ) -> StorageResult<Option<Match>> {
        let guard = self
            .matches
            .read()
            .map_err(|_| StorageError::Backend("matches lock poisoned".to_string()))?;
        Ok(guard
            .by_pair
            .get(&(volunteer_id.clone(), cause_id.clone()))
            .and_then(|id| guard.records.get(id))
            .cloned())
    }

    async fn list_by_volunteer(
        &self,
        volunteer_id: &VolunteerId,
        status: Option<MatchStatus>,
    ) -> StorageResult<Vec<Match>> {
        let guard = self
            .matches
            .read()
            .map_err(|_| StorageError::Backend("matches lock poisoned".to_string()))?;
        let mut values = guard
            .records
            .values()
            .filter(|m| &m.volunteer_id == volunteer_id)
            .filter(|m| status.map_or(true, |s| m.status == s))
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.match_id.cmp(&b.match_id))
        });
        Ok(values)
    }

    async fn list(&self, window: QueryWindow) -> StorageResult<Vec<Match>> {
        let guard = self
            .matches
            .read()
            .map_err(|_| StorageError::Backend("matches lock poisoned".to_string()))?;
        let mut values = guard.records.values().cloned().collect::<Vec<_>>();
        values.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.match_id.cmp(&b.match_id))
        });
        Ok(apply_window(values, window))
    }
}

/// Shape check independent of the stored state.
fn validate_request(match_id: &MatchId, request: &TransitionRequest) -> StorageResult<()> {
    match request.to {
        MatchStatus::Interested => Err(StorageError::InvalidTransition(
            "a match never returns to interested".to_string(),
        )),
        MatchStatus::Verified => match (&request.proof, &request.rejection) {
            (_, Some(_)) => Err(StorageError::InvalidTransition(
                "verified transition cannot carry a rejection".to_string(),
            )),
            (None, None) => Err(StorageError::InvalidTransition(
                "verified transition requires a proof".to_string(),
            )),
            (Some(proof), None) if &proof.match_id != match_id => {
                Err(StorageError::InvalidTransition(format!(
                    "proof issued for match {} cannot be attached to {}",
                    proof.match_id, match_id
                )))
            }
            (Some(_), None) => Ok(()),
        },
        MatchStatus::Rejected => match (&request.proof, &request.rejection) {
            (Some(_), _) => Err(StorageError::InvalidTransition(
                "rejected transition cannot carry a proof".to_string(),
            )),
            (None, None) => Err(StorageError::InvalidTransition(
                "rejected transition requires a rejection".to_string(),
            )),
            (None, Some(_)) => Ok(()),
        },
    }
}

#[async_trait]
impl AttemptStore for InMemoryMatchStore {
    async fn append_attempt(&self, event: AttemptAppend) -> StorageResult<VerificationAttempt> {
        let mut guard = self
            .attempts
            .write()
            .map_err(|_| StorageError::Backend("attempts lock poisoned".to_string()))?;

        let previous_hash = guard.last().map(|e| e.hash.clone());
        let sequence = guard.len() as u64 + 1;
        let hash = compute_attempt_hash(&event, previous_hash.as_deref(), sequence)?;

        let record = VerificationAttempt {
            attempt_id: format!("attempt-{}", Uuid::new_v4()),
            sequence,
            timestamp: event.timestamp,
            match_id: event.match_id,
            org_id: event.org_id,
            stage: event.stage,
            success: event.success,
            message: event.message,
            proof_hash: event.proof_hash,
            previous_hash,
            hash,
        };

        guard.push(record.clone());
        Ok(record)
    }

    async fn list_attempts(&self, window: QueryWindow) -> StorageResult<Vec<VerificationAttempt>> {
        let guard = self
            .attempts
            .read()
            .map_err(|_| StorageError::Backend("attempts lock poisoned".to_string()))?;
        let mut values = guard.clone();
        values.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        Ok(apply_window(values, window))
    }

    async fn latest_attempt_hash(&self) -> StorageResult<Option<String>> {
        let guard = self
            .attempts
            .read()
            .map_err(|_| StorageError::Backend("attempts lock poisoned".to_string()))?;
        Ok(guard.last().map(|e| e.hash.clone()))
    }
}

fn apply_window<T>(items: Vec<T>, window: QueryWindow) -> Vec<T> {
    let iter = items.into_iter().skip(window.offset);
    if window.limit == 0 {
        iter.collect()
    } else {
        iter.take(window.limit).collect()
    }
}
