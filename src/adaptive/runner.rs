//! Closed-loop round runner.
//!
//! Each round follows this pattern:
//! 1. Pick a sequence (first initial-pool sequence, or the update-pool
//!    sequence that best matches the most uncertain condition)
//! 2. Clear the reader, administer the sequence, wait for responses
//! 3. Attach responses to the trials and encode them
//! 4. Fit the estimator under the phase's prior
//! 5. Hand the posterior to the next state

use tokio::sync::watch;

use crate::adaptive::state::{LoopState, RoundPhase};
use crate::adaptive::wait::wait_for_responses;
use crate::analysis::{counter_rng_seed, fit, CoefficientPrior, PosteriorState};
use crate::collaborators::{attach_responses, DesignSynthesizer, ExperimentFrontEnd, ResponseReader};
use crate::config::LoopConfig;
use crate::constants::ACCEPTANCE_WARN_BAND;
use crate::design::{DesignEncoder, DesignSpace};
use crate::error::{LoopError, Result};
use crate::experimentalist::{best_match, select_max_uncertainty, UncertaintyScore};
use crate::types::{CandidatePool, Condition, SynthesisMode, TrialSequence};

/// Condition chosen by the uncertainty sampler in an explore round.
#[derive(Debug, Clone, PartialEq)]
pub struct ExploreTarget {
    /// Winning condition.
    pub condition: Condition,
    /// Its position among the scored candidates.
    pub candidate_index: usize,
    /// Its credible band.
    pub score: UncertaintyScore,
}

/// Everything a round produced.
#[derive(Debug, Clone)]
pub struct RoundReport {
    /// Zero-based round index.
    pub round: usize,
    /// Phase the round ran.
    pub phase: RoundPhase,
    /// Position of the administered sequence in its pool.
    pub pool_index: usize,
    /// Explore target, for explore rounds.
    pub target: Option<ExploreTarget>,
    /// Administered sequence with observed outcomes attached.
    pub sequence: TrialSequence,
    /// Posterior after this round.
    pub posterior: PosteriorState,
    /// KL(posterior || previous posterior), from the second round on.
    pub kl_divergence: Option<f64>,
    /// Seed the sampler ran with.
    pub seed: u64,
}

/// Drives rounds against the three collaborators.
pub struct LoopController<S, F, R> {
    config: LoopConfig,
    encoder: DesignEncoder,
    synthesizer: S,
    front_end: F,
    reader: R,
    cancel: Option<watch::Receiver<bool>>,
}

impl<S, F, R> LoopController<S, F, R>
where
    S: DesignSynthesizer,
    F: ExperimentFrontEnd,
    R: ResponseReader,
{
    /// Controller over the Stroop design space.
    ///
    /// Fails with [`LoopError::Config`] if `config` does not validate.
    pub fn new(config: LoopConfig, synthesizer: S, front_end: F, reader: R) -> Result<Self> {
        config.validate().map_err(LoopError::Config)?;
        let encoder = DesignEncoder::new(DesignSpace::stroop()).strict_coverage(config.strict_coverage);
        Ok(Self {
            config,
            encoder,
            synthesizer,
            front_end,
            reader,
            cancel: None,
        })
    }

    /// Use a different design space.
    pub fn with_design_space(mut self, space: DesignSpace) -> Self {
        self.encoder = DesignEncoder::new(space).strict_coverage(self.config.strict_coverage);
        self
    }

    /// Abort the observation wait once `cancel` carries `true`.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// The controller's configuration.
    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// The encoder used for training batches and candidate scoring.
    pub fn encoder(&self) -> &DesignEncoder {
        &self.encoder
    }

    /// Give back the collaborators.
    pub fn into_parts(self) -> (S, F, R) {
        (self.synthesizer, self.front_end, self.reader)
    }

    /// Run `config.rounds` rounds from [`LoopState::Bootstrap`].
    ///
    /// Stops at the first failing round and returns its error.
    pub async fn run(&mut self) -> Result<Vec<RoundReport>> {
        let mut reports = Vec::with_capacity(self.config.rounds);
        let mut state = LoopState::default();
        for round in 0..self.config.rounds {
            let report = self.run_round(round, &state).await?;
            state = state.advance(report.posterior.clone());
            reports.push(report);
        }
        Ok(reports)
    }

    /// Run one round from `state`.
    ///
    /// The caller advances the state with the returned report's posterior.
    pub async fn run_round(&mut self, round: usize, state: &LoopState) -> Result<RoundReport> {
        let phase = state.phase();
        let previous = state.previous();

        let (pool_index, target, sequence) = match state {
            LoopState::Bootstrap | LoopState::Confirm { .. } => {
                let pool = self.request_pool(SynthesisMode::Initial)?;
                (0, None, first_sequence(&pool)?.clone())
            }
            LoopState::Explore { previous } => {
                let target = self.pick_target(previous)?;
                let pool = self.request_pool(SynthesisMode::Update)?;
                let (index, sequence) = best_match(&target.condition, &pool)?;
                (index, Some(target), sequence.clone())
            }
        };

        let observed = self.administer_and_observe(&sequence).await?;

        let (x, y) = self.encoder.encode(observed.trials())?;
        let prior = match previous {
            None => CoefficientPrior::bootstrap(x.ncols(), self.config.sampler.bootstrap_prior_variance)?,
            Some(p) => p.to_prior(self.config.sampler.min_prior_variance)?,
        };
        let seed = counter_rng_seed(self.config.seed, round as u64);
        let samples = fit(&prior, &self.config.sampler, &x, &y, seed)?;
        let posterior = PosteriorState::from_samples(samples, self.encoder.column_names(), phase.fit_mode());

        let (lo, hi) = ACCEPTANCE_WARN_BAND;
        if !(lo < posterior.acceptance_rate && posterior.acceptance_rate < hi) {
            tracing::warn!(
                round,
                acceptance_rate = posterior.acceptance_rate,
                "sampler acceptance rate outside ({}, {})",
                lo,
                hi
            );
        }

        let kl_divergence = previous.map(|p| posterior.kl_from(p));
        tracing::info!(
            round,
            phase = %phase,
            pool_index,
            trials = observed.len(),
            acceptance_rate = posterior.acceptance_rate,
            kl = kl_divergence.unwrap_or(f64::NAN),
            "round complete"
        );

        Ok(RoundReport {
            round,
            phase,
            pool_index,
            target,
            sequence: observed,
            posterior,
            kl_divergence,
            seed,
        })
    }

    /// Score the initial pool's first sequence and return its most uncertain condition.
    fn pick_target(&mut self, previous: &PosteriorState) -> Result<ExploreTarget> {
        let pool = self.request_pool(SynthesisMode::Initial)?;
        let candidates = first_sequence(&pool)?;
        let (candidate_index, score) =
            select_max_uncertainty(&self.encoder, candidates.trials(), &previous.beta_samples)?;
        let condition = candidates.trials()[candidate_index].condition.clone();

        tracing::debug!(
            candidate_index,
            width = score.width(),
            condition = %condition,
            "most uncertain condition"
        );
        Ok(ExploreTarget {
            condition,
            candidate_index,
            score,
        })
    }

    fn request_pool(&mut self, mode: SynthesisMode) -> Result<CandidatePool> {
        let pool = self.synthesizer.synthesize(mode)?;
        if pool.is_empty() {
            return Err(LoopError::EmptyPool { mode });
        }
        tracing::debug!(%mode, sequences = pool.len(), "candidate pool");
        Ok(pool)
    }

    async fn administer_and_observe(&mut self, sequence: &TrialSequence) -> Result<TrialSequence> {
        self.reader.clear().await?;
        self.front_end.administer(sequence).await?;
        let responses = wait_for_responses(
            &mut self.reader,
            self.config.observation_timeout,
            self.config.poll_interval,
            self.cancel.as_mut(),
        )
        .await?;
        attach_responses(sequence, &responses)
    }
}

fn first_sequence(pool: &CandidatePool) -> Result<&TrialSequence> {
    pool.first().ok_or(LoopError::EmptyPool { mode: pool.mode })
}
