//! Constants shared across the estimator, sampler and loop controller.

/// Default deterministic seed for RNG operations.
///
/// Same seed + same observations = same posterior samples.
/// The value `0x7374726F6F70` is "stroop" encoded in ASCII.
pub const DEFAULT_SEED: u64 = 0x7374726F6F70;

/// Per-coefficient prior variance used for the bootstrap round.
pub const BOOTSTRAP_PRIOR_VARIANCE: f64 = 100.0;

/// Floor applied to degenerate (zero) prior variances carried between rounds.
pub const MIN_PRIOR_VARIANCE: f64 = 1e-10;

/// Default number of Metropolis-Hastings iterations per round.
pub const DEFAULT_MCMC_SAMPLES: usize = 5000;

/// Default random-walk proposal scale.
pub const DEFAULT_STEP_SIZE: f64 = 0.1;

/// Reaction time recorded when the participant did not respond (ms).
pub const RT_CEILING_MS: f64 = 3000.0;

/// Response recorded when the participant did not respond.
pub const FALLBACK_RESPONSE: &str = "j";

/// Lower percentile of the credible band used as the uncertainty proxy.
pub const CREDIBLE_LOWER: f64 = 2.5;

/// Upper percentile of the credible band used as the uncertainty proxy.
pub const CREDIBLE_UPPER: f64 = 97.5;

/// Natural log of 2*pi, used in the Gaussian log-likelihood.
pub const LOG_2PI: f64 = 1.8378770664093453;

/// Acceptance rates outside this band are logged as a mixing problem.
pub const ACCEPTANCE_WARN_BAND: (f64, f64) = (0.05, 0.95);
