//! Configuration for the closed-loop controller and its sampler.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collaborators::ResponseDefaults;
use crate::constants::{
    BOOTSTRAP_PRIOR_VARIANCE, DEFAULT_MCMC_SAMPLES, DEFAULT_SEED, DEFAULT_STEP_SIZE,
    MIN_PRIOR_VARIANCE,
};

/// Metropolis-Hastings settings, shared by every round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Iterations per chain. Every iteration is recorded.
    ///
    /// Default: 5,000.
    pub n_samples: usize,

    /// Random-walk proposal scale for both β and σ².
    ///
    /// Default: 0.1.
    pub step_size: f64,

    /// Per-coefficient prior variance in the bootstrap round.
    ///
    /// Default: 100.
    pub bootstrap_prior_variance: f64,

    /// Floor for prior variances carried from one round to the next.
    ///
    /// Default: 1e-10.
    pub min_prior_variance: f64,

    /// Independent chains per fit, pooled in chain order.
    ///
    /// Default: 1. With the `parallel` feature, chains run on the rayon pool.
    pub chains: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            n_samples: DEFAULT_MCMC_SAMPLES,
            step_size: DEFAULT_STEP_SIZE,
            bootstrap_prior_variance: BOOTSTRAP_PRIOR_VARIANCE,
            min_prior_variance: MIN_PRIOR_VARIANCE,
            chains: 1,
        }
    }
}

/// Configuration for a closed-loop run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    // =========================================================================
    // Loop
    // =========================================================================
    /// Number of rounds to run. Round 0 bootstraps, round 1 confirms, the
    /// rest explore.
    ///
    /// Default: 5.
    pub rounds: usize,

    /// Base seed; round `r` samples with a seed derived from `(seed, r)`.
    pub seed: u64,

    /// Sampler settings.
    pub sampler: SamplerConfig,

    /// Require every feature column to fire in each training batch.
    ///
    /// Default: true.
    pub strict_coverage: bool,

    // =========================================================================
    // Observation wait
    // =========================================================================
    /// How long to wait for the response reader to report data.
    ///
    /// Default: 120 seconds.
    #[serde(with = "duration_ms", rename = "observation_timeout_ms")]
    pub observation_timeout: Duration,

    /// Delay between reader polls.
    ///
    /// Default: 500 ms.
    #[serde(with = "duration_ms", rename = "poll_interval_ms")]
    pub poll_interval: Duration,

    /// Values substituted for missing reaction times and responses.
    pub response_defaults: ResponseDefaults,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            rounds: 5,
            seed: DEFAULT_SEED,
            sampler: SamplerConfig::default(),
            strict_coverage: true,
            observation_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_millis(500),
            response_defaults: ResponseDefaults::default(),
        }
    }
}

impl LoopConfig {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Short chains and a short wait, for development against a simulated participant.
    ///
    /// - 3 rounds
    /// - 1,000 samples per round
    /// - 10 second observation timeout, 50 ms polling
    pub fn quick() -> Self {
        Self {
            rounds: 3,
            sampler: SamplerConfig {
                n_samples: 1_000,
                ..SamplerConfig::default()
            },
            observation_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(50),
            ..Default::default()
        }
    }

    /// Longer runs with pooled chains.
    ///
    /// - 10 rounds
    /// - 4 chains of 20,000 samples each
    /// - 10 minute observation timeout
    pub fn thorough() -> Self {
        Self {
            rounds: 10,
            sampler: SamplerConfig {
                n_samples: 20_000,
                chains: 4,
                ..SamplerConfig::default()
            },
            observation_timeout: Duration::from_secs(600),
            ..Default::default()
        }
    }

    /// Parse a JSON configuration; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate().map_err(crate::LoopError::Config)?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    // =========================================================================
    // Builder methods
    // =========================================================================

    /// Set the number of rounds.
    pub fn rounds(mut self, rounds: usize) -> Self {
        assert!(rounds > 0, "rounds must be positive");
        self.rounds = rounds;
        self
    }

    /// Set the base seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of MCMC iterations per chain.
    pub fn n_samples(mut self, n: usize) -> Self {
        assert!(n > 0, "n_samples must be positive");
        self.sampler.n_samples = n;
        self
    }

    /// Set the proposal scale.
    pub fn step_size(mut self, step: f64) -> Self {
        assert!(step.is_finite() && step > 0.0, "step_size must be positive and finite");
        self.sampler.step_size = step;
        self
    }

    /// Set the bootstrap prior variance.
    pub fn bootstrap_prior_variance(mut self, variance: f64) -> Self {
        assert!(
            variance.is_finite() && variance > 0.0,
            "bootstrap_prior_variance must be positive and finite"
        );
        self.sampler.bootstrap_prior_variance = variance;
        self
    }

    /// Set the number of pooled chains.
    pub fn chains(mut self, chains: usize) -> Self {
        assert!(chains > 0, "chains must be positive");
        self.sampler.chains = chains;
        self
    }

    /// Set the observation timeout.
    pub fn observation_timeout(mut self, timeout: Duration) -> Self {
        assert!(!timeout.is_zero(), "observation_timeout must be non-zero");
        self.observation_timeout = timeout;
        self
    }

    /// Set the reader polling interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        assert!(!interval.is_zero(), "poll_interval must be non-zero");
        self.poll_interval = interval;
        self
    }

    /// Toggle the coverage requirement on training batches.
    pub fn strict_coverage(mut self, strict: bool) -> Self {
        self.strict_coverage = strict;
        self
    }

    /// Validate the configuration.
    ///
    /// Returns an error message if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.rounds == 0 {
            return Err("rounds must be positive".to_string());
        }
        if self.sampler.n_samples == 0 {
            return Err("n_samples must be positive".to_string());
        }
        if !(self.sampler.step_size.is_finite() && self.sampler.step_size > 0.0) {
            return Err("step_size must be positive and finite".to_string());
        }
        if !(self.sampler.bootstrap_prior_variance.is_finite()
            && self.sampler.bootstrap_prior_variance > 0.0)
        {
            return Err("bootstrap_prior_variance must be positive and finite".to_string());
        }
        if !(self.sampler.min_prior_variance.is_finite() && self.sampler.min_prior_variance > 0.0) {
            return Err("min_prior_variance must be positive and finite".to_string());
        }
        if self.sampler.chains == 0 {
            return Err("chains must be positive".to_string());
        }
        if self.observation_timeout.is_zero() {
            return Err("observation_timeout must be non-zero".to_string());
        }
        if self.poll_interval.is_zero() {
            return Err("poll_interval must be non-zero".to_string());
        }
        Ok(())
    }
}

/// Durations as integer milliseconds in JSON.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
