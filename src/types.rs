//! Trial records, conditions and candidate pools.

use std::collections::BTreeMap;
use std::fmt;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Deserializer, Serialize};

/// Feature matrix: one row per trial, one column per non-reference level.
pub type FeatureMatrix = DMatrix<f64>;

/// Target vector: observed reaction time per trial.
pub type TargetVector = DVector<f64>;

/// Factor name for the displayed word.
pub const WORD: &str = "word";

/// Factor name for the ink color.
pub const COLOR: &str = "color";

/// Factor name for the response transition relative to the previous trial.
pub const RESPONSE_TRANSITION: &str = "response_transition";

/// Anything that can report a level for a named factor.
///
/// Implemented by [`Trial`] and [`Condition`] so both are encoded by the same
/// code path.
pub trait FactorLevels {
    /// Level of `factor`, or `None` if the record has no value for it.
    fn level(&self, factor: &str) -> Option<&str>;
}

/// A cell of the design: `(word, color, response_transition)`.
///
/// `response_transition` is `None` for the first trial of a sequence, which
/// has no predecessor to transition from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Condition {
    /// Displayed word.
    pub word: String,
    /// Ink color.
    pub color: String,
    /// `repeat` / `switch`, absent on the first trial.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub response_transition: Option<String>,
}

impl Condition {
    /// Create a condition.
    pub fn new(
        word: impl Into<String>,
        color: impl Into<String>,
        response_transition: Option<&str>,
    ) -> Self {
        Self {
            word: word.into(),
            color: color.into(),
            response_transition: response_transition.map(str::to_owned),
        }
    }
}

impl FactorLevels for Condition {
    fn level(&self, factor: &str) -> Option<&str> {
        match factor {
            WORD => Some(&self.word),
            COLOR => Some(&self.color),
            RESPONSE_TRANSITION => self.response_transition.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "word={} color={} transition={}",
            self.word,
            self.color,
            self.response_transition.as_deref().unwrap_or("-")
        )
    }
}

/// Observed outcome of one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Reaction time in milliseconds.
    pub reaction_time: f64,
    /// Key pressed.
    pub response: String,
}

/// One trial of a sequence.
///
/// Factor values come from the design synthesizer; `outcome` is filled in once
/// the trial has been administered and read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// The design cell this trial belongs to.
    #[serde(flatten)]
    pub condition: Condition,

    /// Observed outcome, if administered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Observation>,

    /// Derived factors the encoder does not use (congruency, correct response, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Trial {
    /// Create an unobserved trial.
    pub fn new(condition: Condition) -> Self {
        Self {
            condition,
            outcome: None,
            extra: BTreeMap::new(),
        }
    }

    /// Attach an extra factor value.
    pub fn with_extra(mut self, factor: impl Into<String>, level: impl Into<String>) -> Self {
        self.extra.insert(factor.into(), level.into());
        self
    }

    /// Whether this trial falls in `condition`.
    pub fn matches(&self, condition: &Condition) -> bool {
        &self.condition == condition
    }

    /// Return a copy of this trial with the given outcome.
    pub fn observed(&self, outcome: Observation) -> Self {
        Self {
            outcome: Some(outcome),
            ..self.clone()
        }
    }
}

impl FactorLevels for Trial {
    fn level(&self, factor: &str) -> Option<&str> {
        self.condition
            .level(factor)
            .or_else(|| self.extra.get(factor).map(String::as_str))
    }
}

/// An ordered run of trials satisfying the synthesizer's sequencing constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrialSequence {
    trials: Vec<Trial>,
}

impl TrialSequence {
    /// Wrap a list of trials.
    pub fn new(trials: Vec<Trial>) -> Self {
        Self { trials }
    }

    /// Trials in presentation order.
    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Number of trials.
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// True if the sequence has no trials.
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Number of trials in `condition`.
    pub fn count_matching(&self, condition: &Condition) -> usize {
        self.trials.iter().filter(|t| t.matches(condition)).count()
    }

    /// Conditions of every trial, in order.
    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.trials.iter().map(|t| &t.condition)
    }

    /// Whether every trial has an outcome attached.
    pub fn is_observed(&self) -> bool {
        self.trials.iter().all(|t| t.outcome.is_some())
    }
}

impl From<Vec<Trial>> for TrialSequence {
    fn from(trials: Vec<Trial>) -> Self {
        Self::new(trials)
    }
}

/// Which flavour of pool to request from the design synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisMode {
    /// Near-exhaustive, reproducible coverage.
    Initial,
    /// Randomized, approximately balanced.
    Update,
}

impl fmt::Display for SynthesisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthesisMode::Initial => write!(f, "initial"),
            SynthesisMode::Update => write!(f, "update"),
        }
    }
}

/// Candidate sequences returned by one synthesis request, in synthesizer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePool {
    /// Mode the pool was synthesized in.
    pub mode: SynthesisMode,
    /// Candidate sequences.
    pub sequences: Vec<TrialSequence>,
}

impl CandidatePool {
    /// Create a pool.
    pub fn new(mode: SynthesisMode, sequences: Vec<TrialSequence>) -> Self {
        Self { mode, sequences }
    }

    /// Number of candidate sequences.
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// True if the synthesizer returned nothing.
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// First sequence of the pool, if any.
    pub fn first(&self) -> Option<&TrialSequence> {
        self.sequences.first()
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
