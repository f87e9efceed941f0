//! Contracts for the three external collaborators of the loop.
//!
//! - [`DesignSynthesizer`] produces pools of constraint-satisfying trial sequences
//! - [`ExperimentFrontEnd`] presents a sequence to a participant
//! - [`ResponseReader`] reports the responses once they exist
//!
//! Administration is fire-and-forget: the front-end returns as soon as the
//! sequence has been handed over, and the controller polls the reader until it
//! reports data.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constants::{FALLBACK_RESPONSE, RT_CEILING_MS};
use crate::error::{LoopError, Result};
use crate::types::{CandidatePool, Observation, SynthesisMode, TrialSequence};

/// Produces candidate sequences.
///
/// `Initial` pools should be reproducible; `Update` pools may be randomized.
/// An empty pool is reported by the controller as [`LoopError::EmptyPool`].
pub trait DesignSynthesizer: Send {
    /// Synthesize a pool of candidate sequences.
    fn synthesize(&mut self, mode: SynthesisMode) -> Result<CandidatePool>;
}

/// Presents a sequence to a participant.
#[async_trait]
pub trait ExperimentFrontEnd: Send {
    /// Start administering `sequence`. Completion is signalled out of band
    /// through the [`ResponseReader`].
    async fn administer(&mut self, sequence: &TrialSequence) -> Result<()>;
}

/// Reads responses produced by the front-end.
#[async_trait]
pub trait ResponseReader: Send {
    /// Discard responses left over from a previous administration.
    async fn clear(&mut self) -> Result<()>;

    /// Latest trial responses, or `None` while none are available yet.
    ///
    /// Rows are filtered to trial rows and have missing fields filled with the
    /// reader's [`ResponseDefaults`].
    async fn read_latest_responses(&mut self) -> Result<Option<Vec<ResponseRecord>>>;
}

/// One trial row reported by a [`ResponseReader`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// Reaction time in milliseconds.
    pub reaction_time: f64,
    /// Key pressed.
    pub response: String,
    /// Raw stimulus marker the row was recognised by.
    pub stimulus: String,
}

impl ResponseRecord {
    /// Outcome to attach to the administered trial.
    pub fn observation(&self) -> Observation {
        Observation {
            reaction_time: self.reaction_time,
            response: self.response.clone(),
        }
    }
}

/// Values substituted for a missing reaction time or response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseDefaults {
    /// Reaction time used when the participant did not respond (ms).
    pub reaction_time: f64,
    /// Response used when the participant did not respond.
    pub response: String,
}

impl Default for ResponseDefaults {
    fn default() -> Self {
        Self {
            reaction_time: RT_CEILING_MS,
            response: FALLBACK_RESPONSE.to_owned(),
        }
    }
}

impl ResponseDefaults {
    /// Build a record, filling in whichever field is missing.
    ///
    /// A reaction time that is present but not finite counts as missing.
    pub fn fill(
        &self,
        reaction_time: Option<f64>,
        response: Option<String>,
        stimulus: impl Into<String>,
    ) -> ResponseRecord {
        ResponseRecord {
            reaction_time: reaction_time
                .filter(|rt| rt.is_finite())
                .unwrap_or(self.reaction_time),
            response: response.unwrap_or_else(|| self.response.clone()),
            stimulus: stimulus.into(),
        }
    }
}

/// Attach responses to the administered trials, in order.
///
/// The reader must report exactly one row per administered trial.
pub fn attach_responses(sequence: &TrialSequence, responses: &[ResponseRecord]) -> Result<TrialSequence> {
    if responses.len() != sequence.len() {
        return Err(LoopError::ObservationMismatch {
            expected: sequence.len(),
            got: responses.len(),
        });
    }
    Ok(sequence
        .trials()
        .iter()
        .zip(responses)
        .map(|(trial, response)| trial.observed(response.observation()))
        .collect::<Vec<_>>()
        .into())
}
