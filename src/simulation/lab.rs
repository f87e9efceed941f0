//! In-process front-end and reader backed by a synthetic participant.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::collaborators::{ExperimentFrontEnd, ResponseDefaults, ResponseReader, ResponseRecord};
use crate::error::{LoopError, Result};
use crate::simulation::synthesizer::correct_response;
use crate::types::{Trial, TrialSequence};

/// Reaction-time model of a simulated participant.
///
/// ```text
/// rt = base + congruency_cost·[incongruent] + switch_cost·[switch] + N(0, noise_sd²)
/// ```
///
/// With probability `miss_rate` the participant does not respond and the row
/// carries neither a reaction time nor a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedParticipant {
    /// Reaction time on a congruent repeat trial (ms).
    pub base_rt: f64,
    /// Extra time when word and ink differ (ms).
    pub congruency_cost: f64,
    /// Extra time when the correct response switches (ms).
    pub switch_cost: f64,
    /// Standard deviation of the noise (ms).
    pub noise_sd: f64,
    /// Probability of pressing the wrong key.
    pub error_rate: f64,
    /// Probability of not responding at all.
    pub miss_rate: f64,
}

impl Default for SimulatedParticipant {
    fn default() -> Self {
        Self {
            base_rt: 600.0,
            congruency_cost: 80.0,
            switch_cost: 40.0,
            noise_sd: 50.0,
            error_rate: 0.05,
            miss_rate: 0.02,
        }
    }
}

impl SimulatedParticipant {
    /// Mean reaction time for a trial, before noise.
    pub fn expected_rt(&self, trial: &Trial) -> f64 {
        let c = &trial.condition;
        let mut rt = self.base_rt;
        if c.word != c.color {
            rt += self.congruency_cost;
        }
        if c.response_transition.as_deref() == Some("switch") {
            rt += self.switch_cost;
        }
        rt
    }

    /// Respond to one trial.
    pub fn respond<G: Rng>(&self, trial: &Trial, rng: &mut G, defaults: &ResponseDefaults) -> ResponseRecord {
        let c = &trial.condition;
        let stimulus = format!("<div style='color: {}'>{}</div>", c.color, c.word);

        if rng.random::<f64>() < self.miss_rate {
            return defaults.fill(None, None, stimulus);
        }

        let noise: f64 = rng.sample(StandardNormal);
        let rt = (self.expected_rt(trial) + noise * self.noise_sd).max(1.0);
        let correct = correct_response(&c.color);
        let response = if rng.random::<f64>() < self.error_rate {
            if correct == "f" { "j" } else { "f" }
        } else {
            correct
        };
        defaults.fill(Some(rt), Some(response.to_owned()), stimulus)
    }
}

#[derive(Debug, Default)]
struct Pending {
    ready_at: Option<Instant>,
    responses: Vec<ResponseRecord>,
}

type Shared = Arc<Mutex<Pending>>;

fn lock(shared: &Shared) -> Result<std::sync::MutexGuard<'_, Pending>> {
    shared
        .lock()
        .map_err(|_| LoopError::Collaborator("simulated lab state poisoned".into()))
}

/// Create a connected front-end / reader pair.
///
/// Responses become visible to the reader `delay` after administration.
/// Missed trials are filled from `defaults`.
pub fn simulated_lab(
    participant: SimulatedParticipant,
    seed: u64,
    delay: Duration,
    defaults: ResponseDefaults,
) -> (SimulatedFrontEnd, SimulatedReader) {
    let shared = Shared::default();
    (
        SimulatedFrontEnd {
            participant,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            delay,
            defaults,
            administered: Vec::new(),
            shared: Arc::clone(&shared),
        },
        SimulatedReader { shared },
    )
}

/// Front-end that runs the synthetic participant through each sequence.
#[derive(Debug)]
pub struct SimulatedFrontEnd {
    participant: SimulatedParticipant,
    rng: Xoshiro256PlusPlus,
    delay: Duration,
    defaults: ResponseDefaults,
    administered: Vec<TrialSequence>,
    shared: Shared,
}

impl SimulatedFrontEnd {
    /// Sequences administered so far, in order.
    pub fn administered(&self) -> &[TrialSequence] {
        &self.administered
    }
}

#[async_trait]
impl ExperimentFrontEnd for SimulatedFrontEnd {
    async fn administer(&mut self, sequence: &TrialSequence) -> Result<()> {
        let responses: Vec<ResponseRecord> = sequence
            .trials()
            .iter()
            .map(|t| self.participant.respond(t, &mut self.rng, &self.defaults))
            .collect();

        let mut pending = lock(&self.shared)?;
        pending.ready_at = Some(Instant::now() + self.delay);
        pending.responses = responses;
        drop(pending);

        tracing::debug!(trials = sequence.len(), delay = ?self.delay, "simulated administration");
        self.administered.push(sequence.clone());
        Ok(())
    }
}

/// Reader over responses produced by [`SimulatedFrontEnd`].
#[derive(Debug, Clone)]
pub struct SimulatedReader {
    shared: Shared,
}

#[async_trait]
impl ResponseReader for SimulatedReader {
    async fn clear(&mut self) -> Result<()> {
        *lock(&self.shared)? = Pending::default();
        Ok(())
    }

    async fn read_latest_responses(&mut self) -> Result<Option<Vec<ResponseRecord>>> {
        let pending = lock(&self.shared)?;
        match pending.ready_at {
            Some(at) if Instant::now() >= at => Ok(Some(pending.responses.clone())),
            _ => Ok(None),
        }
    }
}
