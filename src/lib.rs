//! # closed-loop-design
//!
//! Closed-loop sequential experiment design for a two-color Stroop task.
//!
//! Each round administers one trial sequence, reads back reaction times and
//! refits a Bayesian linear regression of reaction time on the design
//! factors. The posterior of one round becomes the prior of the next, and
//! from the third round on the next sequence is chosen to cover the
//! condition the model is least certain about.
//!
//! ## Components
//!
//! - [`design`]: one-hot encoding against a fixed factor/level universe
//! - [`analysis`]: Metropolis-Hastings fit of `(β, σ²)`
//! - [`experimentalist`]: uncertainty sampler and candidate matcher
//! - [`adaptive`]: the BOOTSTRAP → CONFIRM → EXPLORE loop and its observation wait
//! - [`collaborators`]: contracts for the synthesizer, front-end and response reader
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//! use closed_loop_design::{LoopConfig, LoopController};
//! use closed_loop_design::simulation::{simulated_lab, CounterbalancedSynthesizer, SimulatedParticipant};
//!
//! let config = LoopConfig::quick();
//! let (front_end, reader) = simulated_lab(
//!     SimulatedParticipant::default(),
//!     1,
//!     Duration::from_millis(200),
//!     config.response_defaults.clone(),
//! );
//! let mut controller = LoopController::new(
//!     config,
//!     CounterbalancedSynthesizer::new(1),
//!     front_end,
//!     reader,
//! )?;
//!
//! for report in controller.run().await? {
//!     println!("{}", closed_loop_design::output::format_round(&report));
//! }
//! ```
//!
//! ## Modeling caveat
//!
//! The uncertainty sampler pushes predictions of a reaction-time regression
//! through a logistic sigmoid. See [`experimentalist::uncertainty`].

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod config;
mod constants;
mod error;
mod types;

// Functional modules
pub mod adaptive;
pub mod analysis;
pub mod collaborators;
pub mod data;
pub mod design;
pub mod experimentalist;
pub mod output;
pub mod simulation;
pub mod statistics;

// Re-exports for public API
pub use adaptive::{LoopController, LoopState, RoundPhase, RoundReport};
pub use analysis::{fit, CoefficientPrior, FitMode, PosteriorState};
pub use config::{LoopConfig, SamplerConfig};
pub use constants::{
    BOOTSTRAP_PRIOR_VARIANCE, DEFAULT_SEED, FALLBACK_RESPONSE, LOG_2PI, MIN_PRIOR_VARIANCE,
    RT_CEILING_MS,
};
pub use design::{DesignEncoder, DesignSpace, Factor, ReferenceLevel};
pub use error::{EncodingError, LoopError, Result};
pub use types::{
    CandidatePool, Condition, FactorLevels, FeatureMatrix, Observation, SynthesisMode,
    TargetVector, Trial, TrialSequence, COLOR, RESPONSE_TRANSITION, WORD,
};
