//! Claim outcomes posted by the arbiter to an agent's mailbox.

use std::fmt;

/// Result of resolving one claim.
///
/// The arbiter writes exactly one outcome per dequeued claim into the
/// claiming agent's single-slot mailbox; the agent clears it when it
/// consumes it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// No score effect. Posted for ruined claims and as the empty
    /// mailbox value.
    #[default]
    None,
    /// The claim was valid: score +1, point freeze.
    Point,
    /// The claim was invalid: penalty freeze, no score change.
    Penalty,
}

impl Outcome {
    /// Whether consuming this outcome starts a freeze window.
    pub fn freezes(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Point => write!(f, "point"),
            Self::Penalty => write!(f, "penalty"),
        }
    }
}
