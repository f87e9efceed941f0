//! Bayesian linear regression of reaction time on design features.
//!
//! 1. **Sampler** ([`metropolis`]): random-walk Metropolis-Hastings over `(β, σ²)`
//! 2. **Posterior** ([`posterior`]): marginal summary carried to the next round as its prior
//! 3. **Diagnostics**: effective sample size and round-to-round KL divergence

mod diagnostics;
pub mod metropolis;
pub mod posterior;

pub use diagnostics::{compute_ess, kl_divergence_diagonal};
pub use metropolis::{
    counter_rng_seed, fit, CoefficientPrior, FitMode, LogPosterior, MetropolisSampler, SampleSet,
};
pub use posterior::{PosteriorState, PosteriorSummary};
