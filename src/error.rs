//! Error types for the closed-loop controller.
//!
//! Every variant is fatal to the round that produced it. The controller never
//! attempts partial recovery; the error is surfaced to the caller of the loop.

use std::time::Duration;

use thiserror::Error;

use crate::types::SynthesisMode;

/// Errors raised while turning trials into a feature matrix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// No trials were supplied.
    #[error("cannot encode an empty trial set")]
    EmptyTrialSet,

    /// A trial carries a level outside the declared universe of its factor.
    #[error("level '{level}' is not part of factor '{factor}'")]
    UnknownLevel {
        /// Factor name.
        factor: String,
        /// The offending level.
        level: String,
    },

    /// A trial has no value for a factor whose reference is a concrete level.
    #[error("trial has no value for factor '{factor}'")]
    MissingLevel {
        /// Factor name.
        factor: String,
    },

    /// A trial used as training data has not been observed yet.
    #[error("trial {index} has no observed outcome")]
    MissingOutcome {
        /// Position of the trial in the encoded batch.
        index: usize,
    },

    /// Strict coverage is on and some feature columns never fire in this batch.
    #[error("trial set does not produce expected columns: {columns:?}")]
    MissingColumns {
        /// Names of the columns that are all zero.
        columns: Vec<String>,
    },

    /// A coefficient vector does not line up with the encoder's column set.
    #[error("expected {expected} feature columns, got {got}")]
    ColumnMismatch {
        /// Number of columns the encoder produces.
        expected: usize,
        /// Number of columns supplied.
        got: usize,
    },
}

/// Errors that halt the closed loop.
#[derive(Debug, Error)]
pub enum LoopError {
    /// Encoding failed (factor/level mismatch, empty batch, missing outcome).
    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    /// A non-positive or non-finite quantity reached the sampler.
    #[error("numeric error: {context}")]
    Numeric {
        /// What was being computed.
        context: String,
    },

    /// The design synthesizer returned no candidate sequences.
    #[error("design synthesizer returned an empty pool for mode '{mode}'")]
    EmptyPool {
        /// Synthesis mode that was requested.
        mode: SynthesisMode,
    },

    /// Administration produced no observations within the wait window.
    #[error("no observations after waiting {waited:?}")]
    ObservationTimeout {
        /// How long the controller waited.
        waited: Duration,
    },

    /// The caller cancelled the wait for observations.
    #[error("wait for observations was cancelled")]
    Cancelled,

    /// The reader reported a different number of trial rows than were administered.
    #[error("administered {expected} trials but the response log has {got} trial rows")]
    ObservationMismatch {
        /// Trials in the administered sequence.
        expected: usize,
        /// Trial rows reported by the reader.
        got: usize,
    },

    /// An external collaborator reported a failure.
    #[error("collaborator failed: {0}")]
    Collaborator(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Filesystem error (response log, config file).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed JSON (response log, config file).
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl LoopError {
    /// Shorthand for a [`LoopError::Numeric`] error.
    pub fn numeric(context: impl Into<String>) -> Self {
        LoopError::Numeric {
            context: context.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LoopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_error_converts() {
        let err: LoopError = EncodingError::EmptyTrialSet.into();
        assert!(matches!(err, LoopError::Encoding(EncodingError::EmptyTrialSet)));
        assert_eq!(
            err.to_string(),
            "encoding failed: cannot encode an empty trial set"
        );
    }

    #[test]
    fn test_empty_pool_display_names_mode() {
        let err = LoopError::EmptyPool {
            mode: SynthesisMode::Update,
        };
        assert!(err.to_string().contains("update"));
    }
}
