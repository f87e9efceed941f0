//! Loop state machine: BOOTSTRAP → CONFIRM → EXPLORE → EXPLORE → ...
//!
//! The only thing carried between rounds is the immediately preceding
//! round's [`PosteriorState`], held inside the state value itself.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::{FitMode, PosteriorState};

/// What a round does, without its carried posterior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundPhase {
    /// Administer the first initial-pool sequence, fit under the wide prior.
    Bootstrap,
    /// Administer the first initial-pool sequence again, fit under the carried prior.
    Confirm,
    /// Target the most uncertain condition, administer the best-matching
    /// update-pool sequence, fit under the carried prior.
    Explore,
}

impl RoundPhase {
    /// Estimator mode used by this phase.
    pub fn fit_mode(self) -> FitMode {
        match self {
            RoundPhase::Bootstrap => FitMode::Bootstrap,
            RoundPhase::Confirm | RoundPhase::Explore => FitMode::Refine,
        }
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundPhase::Bootstrap => write!(f, "BOOTSTRAP"),
            RoundPhase::Confirm => write!(f, "CONFIRM"),
            RoundPhase::Explore => write!(f, "EXPLORE"),
        }
    }
}

/// State entering a round.
#[derive(Debug, Clone, Default)]
pub enum LoopState {
    /// No posterior yet.
    #[default]
    Bootstrap,
    /// Posterior from the bootstrap round.
    Confirm {
        /// Posterior of the previous round.
        previous: PosteriorState,
    },
    /// Posterior from the previous confirm or explore round.
    Explore {
        /// Posterior of the previous round.
        previous: PosteriorState,
    },
}

impl LoopState {
    /// Phase this state runs.
    pub fn phase(&self) -> RoundPhase {
        match self {
            LoopState::Bootstrap => RoundPhase::Bootstrap,
            LoopState::Confirm { .. } => RoundPhase::Confirm,
            LoopState::Explore { .. } => RoundPhase::Explore,
        }
    }

    /// Posterior carried into this round, if any.
    pub fn previous(&self) -> Option<&PosteriorState> {
        match self {
            LoopState::Bootstrap => None,
            LoopState::Confirm { previous } | LoopState::Explore { previous } => Some(previous),
        }
    }

    /// State for the next round, given this round's posterior.
    pub fn advance(self, posterior: PosteriorState) -> LoopState {
        match self {
            LoopState::Bootstrap => LoopState::Confirm {
                previous: posterior,
            },
            LoopState::Confirm { .. } | LoopState::Explore { .. } => LoopState::Explore {
                previous: posterior,
            },
        }
    }
}
