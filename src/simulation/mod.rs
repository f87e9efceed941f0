//! Simulated collaborators for running the loop without a browser.
//!
//! - [`CounterbalancedSynthesizer`]: seeded counterbalanced sequence pools
//! - [`simulated_lab`]: front-end / reader pair sharing a synthetic participant

mod lab;
mod synthesizer;

pub use lab::{simulated_lab, SimulatedFrontEnd, SimulatedParticipant, SimulatedReader};
pub use synthesizer::{correct_response, stroop_trial, CounterbalancedSynthesizer};
