use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Progress of a single verification attempt.
///
/// `Requested → TrustChecked → Anchoring → Finalized`, with `Failed`
/// reachable from `TrustChecked` and `Anchoring`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStage {
    Requested,
    TrustChecked,
    Anchoring,
    Finalized,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal verification stage change {from} -> {to}")]
pub struct StageError {
    pub from: VerificationStage,
    pub to: VerificationStage,
}

impl VerificationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStage::Requested => "requested",
            VerificationStage::TrustChecked => "trust_checked",
            VerificationStage::Anchoring => "anchoring",
            VerificationStage::Finalized => "finalized",
            VerificationStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VerificationStage::Finalized | VerificationStage::Failed)
    }

    /// Move to `next` if the state machine allows it.
    pub fn advance(self, next: VerificationStage) -> Result<VerificationStage, StageError> {
        use VerificationStage::*;
        match (self, next) {
            (Requested, TrustChecked)
            | (TrustChecked, Anchoring)
            | (TrustChecked, Failed)
            | (Anchoring, Finalized)
            | (Anchoring, Failed) => Ok(next),
            (from, to) => Err(StageError { from, to }),
        }
    }
}

impl std::fmt::Display for VerificationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::VerificationStage::*;
    use super::*;

    #[test]
    fn happy_path_and_failure_edges() {
        let stage = Requested.advance(TrustChecked).unwrap();
        let stage = stage.advance(Anchoring).unwrap();
        assert_eq!(stage.advance(Finalized).unwrap(), Finalized);
        assert_eq!(Anchoring.advance(Failed).unwrap(), Failed);
        assert_eq!(TrustChecked.advance(Failed).unwrap(), Failed);
    }

    #[test]
    fn skipping_or_leaving_terminal_stages_is_rejected() {
        assert!(Requested.advance(Anchoring).is_err());
        assert!(Requested.advance(Failed).is_err());
        assert!(TrustChecked.advance(Finalized).is_err());
        for terminal in [Finalized, Failed] {
            assert!(terminal.is_terminal());
            for next in [Requested, TrustChecked, Anchoring, Finalized, Failed] {
                assert!(terminal.advance(next).is_err());
            }
        }
    }
}
