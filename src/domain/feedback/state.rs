//! Generation lifecycle of a single request

use std::fmt;

/// Stage of a generation request
///
/// `Persisted`, `Rejected` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Received,
    Validated,
    Evaluating,
    Narrating,
    Persisted,
    Rejected,
    Failed,
}

impl GenerationStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Persisted | Self::Rejected | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: GenerationStage) -> bool {
        use GenerationStage::*;

        matches!(
            (self, next),
            (Received, Validated)
                | (Received, Rejected)
                | (Validated, Evaluating)
                | (Evaluating, Narrating)
                | (Evaluating, Failed)
                | (Narrating, Persisted)
                | (Narrating, Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Evaluating => "evaluating",
            Self::Narrating => "narrating",
            Self::Persisted => "persisted",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
