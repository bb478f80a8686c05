use chrono::{DateTime, Utc};
use impact_types::{CauseId, ProofHash, VolunteerId};

const PROOF_DOMAIN: &[u8] = b"impact-proof-v1";

/// Content hash of a proof.
///
/// blake3 over a domain tag, the length-prefixed volunteer and cause ids, and
/// the issuance instant in nanoseconds. Re-issuing at a different instant
/// always yields a distinct hash.
pub fn compute_proof_hash(
    volunteer_id: &VolunteerId,
    cause_id: &CauseId,
    issued_at: DateTime<Utc>,
) -> ProofHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(PROOF_DOMAIN);
    for field in [volunteer_id.as_str(), cause_id.as_str()] {
        hasher.update(&(field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    let nanos = i128::from(issued_at.timestamp()) * 1_000_000_000
        + i128::from(issued_at.timestamp_subsec_nanos());
    hasher.update(&nanos.to_le_bytes());
    ProofHash::from_bytes(hasher.finalize().as_bytes())
}
