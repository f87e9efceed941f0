//! Random-walk Metropolis-Hastings for Bayesian linear regression.
//!
//! Model:
//!
//! ```text
//! y | β, σ² ~ N(Xβ, σ² I)
//! β_j       ~ N(m_j, v_j)          independent per coefficient
//! p(σ²)     ∝ 1/σ²                 improper, log-density -ln σ²
//! ```
//!
//! The bootstrap round uses `m = 0`, `v = 100`. Later rounds use the previous
//! round's marginal sample moments as `(m, v)`: a diagonal Gaussian summary of
//! the last chain, not its full joint distribution.
//!
//! Each iteration proposes β and σ² jointly:
//!
//! ```text
//! β'  = β + step · z,       z ~ N(0, I)
//! σ²' = | σ² + step · w |,  w ~ N(0, 1)
//! ```
//!
//! and accepts iff `ln U < ln π(β', σ²') - ln π(β, σ²)`. The reflection of σ²'
//! makes the proposal asymmetric near zero and the ratio is not corrected for
//! it. That bias is kept so that a fixed seed reproduces the same chains.
//!
//! Every iteration's current state is recorded: no burn-in, no thinning.

use nalgebra::{DMatrix, DVector};
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256PlusPlus;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::SamplerConfig;
use crate::constants::LOG_2PI;
use crate::error::{EncodingError, LoopError, Result};

/// Which prior the coefficients are fitted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMode {
    /// First round: zero-mean Gaussian with a fixed, wide variance.
    Bootstrap,
    /// Later rounds: Gaussian centred on the previous round's summary.
    Refine,
}

/// Independent Gaussian prior on each regression coefficient.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientPrior {
    mode: FitMode,
    mean: DVector<f64>,
    variance: DVector<f64>,
}

impl CoefficientPrior {
    /// `N(0, variance)` on each of `n_params` coefficients.
    pub fn bootstrap(n_params: usize, variance: f64) -> Result<Self> {
        if !(variance.is_finite() && variance > 0.0) {
            return Err(LoopError::numeric(format!(
                "bootstrap prior variance must be positive and finite, got {}",
                variance
            )));
        }
        Ok(Self {
            mode: FitMode::Bootstrap,
            mean: DVector::zeros(n_params),
            variance: DVector::from_element(n_params, variance),
        })
    }

    /// Prior centred on a previous posterior summary.
    ///
    /// Variances that are exactly zero (a chain that never moved along that
    /// coefficient) are raised to `min_variance`. Negative or non-finite
    /// moments are a [`LoopError::Numeric`].
    pub fn refine(mean: DVector<f64>, variance: DVector<f64>, min_variance: f64) -> Result<Self> {
        if mean.len() != variance.len() {
            return Err(EncodingError::ColumnMismatch {
                expected: mean.len(),
                got: variance.len(),
            }
            .into());
        }
        if let Some(j) = mean.iter().position(|m| !m.is_finite()) {
            return Err(LoopError::numeric(format!(
                "prior mean of coefficient {} is not finite",
                j
            )));
        }
        if let Some(j) = variance.iter().position(|v| !v.is_finite() || *v < 0.0) {
            return Err(LoopError::numeric(format!(
                "prior variance of coefficient {} is {}",
                j, variance[j]
            )));
        }

        let floored = variance.iter().filter(|&&v| v < min_variance).count();
        if floored > 0 {
            tracing::warn!(
                floored,
                min_variance,
                "degenerate prior variance raised to floor"
            );
        }
        let variance = variance.map(|v| v.max(min_variance));

        Ok(Self {
            mode: FitMode::Refine,
            mean,
            variance,
        })
    }

    /// Fit mode this prior corresponds to.
    pub fn mode(&self) -> FitMode {
        self.mode
    }

    /// Number of coefficients.
    pub fn n_params(&self) -> usize {
        self.mean.len()
    }

    /// Prior means.
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Prior variances (after flooring).
    pub fn variance(&self) -> &DVector<f64> {
        &self.variance
    }

    fn log_density(&self, beta: &DVector<f64>) -> f64 {
        let mut acc = 0.0;
        for j in 0..beta.len() {
            let d = beta[j] - self.mean[j];
            acc += d * d / self.variance[j];
        }
        -0.5 * acc
    }
}

/// Unnormalized log posterior of `(β, σ²)` given `(X, y)`.
#[derive(Debug, Clone)]
pub struct LogPosterior<'a> {
    x: &'a DMatrix<f64>,
    y: &'a DVector<f64>,
    prior: &'a CoefficientPrior,
}

impl<'a> LogPosterior<'a> {
    /// Bind data and prior.
    pub fn new(x: &'a DMatrix<f64>, y: &'a DVector<f64>, prior: &'a CoefficientPrior) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(LoopError::numeric(format!(
                "feature matrix has {} rows but target has {}",
                x.nrows(),
                y.len()
            )));
        }
        if x.ncols() != prior.n_params() {
            return Err(EncodingError::ColumnMismatch {
                expected: prior.n_params(),
                got: x.ncols(),
            }
            .into());
        }
        Ok(Self { x, y, prior })
    }

    /// Gaussian log-likelihood `-½ Σ [ln(2πσ²) + (y - Xβ)²/σ²]`.
    pub fn log_likelihood(&self, beta: &DVector<f64>, sigma2: f64) -> f64 {
        let residuals = self.y - self.x * beta;
        let n = self.y.len() as f64;
        -0.5 * (n * (LOG_2PI + sigma2.ln()) + residuals.norm_squared() / sigma2)
    }

    /// Log prior: coefficient Gaussian plus `-ln σ²`.
    pub fn log_prior(&self, beta: &DVector<f64>, sigma2: f64) -> f64 {
        self.prior.log_density(beta) - sigma2.ln()
    }

    /// Log posterior; `-inf` outside the support (σ² ≤ 0 or non-finite).
    ///
    /// A reflected proposal can land exactly on σ² = 0. Such proposals are
    /// rejected here instead of producing `ln 0` arithmetic.
    pub fn eval(&self, beta: &DVector<f64>, sigma2: f64) -> f64 {
        if !(sigma2 > 0.0 && sigma2.is_finite()) {
            return f64::NEG_INFINITY;
        }
        self.log_prior(beta, sigma2) + self.log_likelihood(beta, sigma2)
    }
}

/// Samples from one or more pooled chains.
#[derive(Debug, Clone)]
pub struct SampleSet {
    /// `n_samples × n_params`, one row per recorded iteration.
    pub beta_samples: DMatrix<f64>,
    /// One σ² per recorded iteration.
    pub sigma2_samples: DVector<f64>,
    /// Accepted proposals / iterations, over all chains.
    pub acceptance_rate: f64,
    /// Number of chains pooled into the sample matrices.
    pub chains: usize,
}

/// Random-walk Metropolis-Hastings sampler.
pub struct MetropolisSampler {
    /// Proposal scale for both β and σ².
    step_size: f64,

    /// Deterministic RNG.
    rng: Xoshiro256PlusPlus,
}

impl MetropolisSampler {
    /// Create a sampler.
    ///
    /// # Arguments
    /// * `step_size` - Proposal standard deviation
    /// * `seed` - Deterministic RNG seed
    pub fn new(step_size: f64, seed: u64) -> Self {
        Self {
            step_size,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// Run a single chain for exactly `n_samples` iterations.
    ///
    /// The chain starts at `β ~ N(0, I)`, `σ² = 1`.
    pub fn run(&mut self, target: &LogPosterior<'_>, n_samples: usize) -> Result<SampleSet> {
        let n_params = target.prior.n_params();

        let mut beta = self.standard_normal_vector(n_params);
        let mut sigma2 = 1.0;
        let mut log_post = target.eval(&beta, sigma2);
        if !log_post.is_finite() {
            return Err(LoopError::numeric(format!(
                "log posterior at the starting point is {}",
                log_post
            )));
        }

        let mut beta_samples = DMatrix::zeros(n_samples, n_params);
        let mut sigma2_samples = DVector::zeros(n_samples);
        let mut accepted = 0usize;

        for i in 0..n_samples {
            let beta_prop = &beta + self.standard_normal_vector(n_params) * self.step_size;
            let sigma2_prop = (sigma2 + self.standard_normal() * self.step_size).abs();
            let log_post_prop = target.eval(&beta_prop, sigma2_prop);

            let u: f64 = self.rng.random();
            if u.ln() < log_post_prop - log_post {
                beta = beta_prop;
                sigma2 = sigma2_prop;
                log_post = log_post_prop;
                accepted += 1;
            }

            beta_samples.set_row(i, &beta.transpose());
            sigma2_samples[i] = sigma2;
        }

        let acceptance_rate = if n_samples > 0 {
            accepted as f64 / n_samples as f64
        } else {
            0.0
        };
        tracing::debug!(n_samples, acceptance_rate, "metropolis chain finished");

        Ok(SampleSet {
            beta_samples,
            sigma2_samples,
            acceptance_rate,
            chains: 1,
        })
    }

    fn standard_normal(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }

    fn standard_normal_vector(&mut self, n: usize) -> DVector<f64> {
        DVector::from_fn(n, |_, _| self.standard_normal())
    }
}

/// Fit `(β, σ²)` to `(X, y)` under `prior`.
///
/// With `config.chains == 1` this is one chain seeded with `seed`. With more
/// chains, chain `k` is seeded with `counter_rng_seed(seed, k)` and the
/// samples are stacked in chain order.
pub fn fit(
    prior: &CoefficientPrior,
    config: &SamplerConfig,
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    seed: u64,
) -> Result<SampleSet> {
    let target = LogPosterior::new(x, y, prior)?;
    if !(config.step_size.is_finite() && config.step_size > 0.0) {
        return Err(LoopError::numeric(format!(
            "step size must be positive and finite, got {}",
            config.step_size
        )));
    }
    if config.n_samples == 0 {
        return Err(LoopError::numeric("sampler needs at least one iteration"));
    }

    if config.chains <= 1 {
        return MetropolisSampler::new(config.step_size, seed).run(&target, config.n_samples);
    }

    let run_chain = |k: usize| {
        MetropolisSampler::new(config.step_size, counter_rng_seed(seed, k as u64))
            .run(&target, config.n_samples)
    };

    #[cfg(feature = "parallel")]
    let chains: Vec<SampleSet> = (0..config.chains)
        .into_par_iter()
        .map(run_chain)
        .collect::<Result<_>>()?;

    #[cfg(not(feature = "parallel"))]
    let chains: Vec<SampleSet> = (0..config.chains).map(run_chain).collect::<Result<_>>()?;

    Ok(pool_chains(&chains))
}

/// Stack chains row-wise; the acceptance rate is the pooled fraction.
fn pool_chains(chains: &[SampleSet]) -> SampleSet {
    let n_params = chains.first().map_or(0, |c| c.beta_samples.ncols());
    let total: usize = chains.iter().map(|c| c.beta_samples.nrows()).sum();

    let mut beta_samples = DMatrix::zeros(total, n_params);
    let mut sigma2_samples = DVector::zeros(total);
    let mut offset = 0;
    let mut accepted = 0.0;
    for chain in chains {
        let rows = chain.beta_samples.nrows();
        beta_samples
            .rows_mut(offset, rows)
            .copy_from(&chain.beta_samples);
        sigma2_samples
            .rows_mut(offset, rows)
            .copy_from(&chain.sigma2_samples);
        accepted += chain.acceptance_rate * rows as f64;
        offset += rows;
    }

    SampleSet {
        beta_samples,
        sigma2_samples,
        acceptance_rate: if total > 0 { accepted / total as f64 } else { 0.0 },
        chains: chains.len(),
    }
}

/// Derive a well-mixed seed for stream `counter` from a base seed (SplitMix64).
pub fn counter_rng_seed(seed: u64, counter: u64) -> u64 {
    let mut z = seed.wrapping_add(counter.wrapping_add(1).wrapping_mul(0x9E3779B97F4A7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
