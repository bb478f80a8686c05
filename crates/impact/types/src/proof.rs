use crate::{MatchId, OrgId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A 32-byte content hash, carried as 64 lowercase hex characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProofHash(String);

impl ProofHash {
    pub const HEX_LEN: usize = 64;

    /// Parse a hex digest, accepting an optional `0x` prefix and any case.
    pub fn parse(input: &str) -> Result<Self, ProofHashError> {
        let trimmed = input.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if hex.len() != Self::HEX_LEN {
            return Err(ProofHashError::Length(hex.len()));
        }
        if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(ProofHashError::NonHex(bad));
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        let mut hex = String::with_capacity(Self::HEX_LEN);
        for byte in bytes {
            hex.push_str(&format!("{:02x}", byte));
        }
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x`-prefixed form, as submitted to EVM-style ledgers.
    pub fn to_prefixed(&self) -> String {
        format!("0x{}", self.0)
    }
}

impl std::fmt::Display for ProofHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProofHash {
    type Error = ProofHashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProofHash> for String {
    fn from(value: ProofHash) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofHashError {
    #[error("proof hash must be {len} hex characters, got {0}", len = ProofHash::HEX_LEN)]
    Length(usize),

    #[error("proof hash contains non-hex character '{0}'")]
    NonHex(char),
}

/// What the external ledger hands back after accepting a hash.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnchorReceipt {
    /// External reference, e.g. a transaction hash.
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    pub anchored_at: DateTime<Utc>,
}

/// Proof that a match was verified, anchored externally.
///
/// Attached to its match exactly once and never overwritten.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProofRecord {
    pub match_id: MatchId,
    pub content_hash: ProofHash,
    pub anchor_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    pub anchored_at: DateTime<Utc>,
    pub issued_at: DateTime<Utc>,
    pub verified_by: OrgId,
}

impl ProofRecord {
    pub fn from_receipt(
        match_id: MatchId,
        content_hash: ProofHash,
        issued_at: DateTime<Utc>,
        verified_by: OrgId,
        receipt: AnchorReceipt,
    ) -> Self {
        Self {
            match_id,
            content_hash,
            anchor_reference: receipt.reference,
            block_number: receipt.block_number,
            anchored_at: receipt.anchored_at,
            issued_at,
            verified_by,
        }
    }
}
