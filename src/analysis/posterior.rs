//! Posterior state produced by one estimator round.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::diagnostics::{compute_ess, kl_divergence_diagonal};
use super::metropolis::{CoefficientPrior, FitMode, SampleSet};
use crate::statistics::{column_means, column_variances};

/// Samples from a fitted round plus their marginal summary.
///
/// `posterior_mean` and `posterior_var` are the per-column sample mean and
/// population variance of `beta_samples`. They are what the next round's
/// prior is built from; correlations between coefficients are not carried.
#[derive(Debug, Clone)]
pub struct PosteriorState {
    /// `n_samples × n_params`.
    pub beta_samples: DMatrix<f64>,

    /// Noise variance draws.
    pub sigma2_samples: DVector<f64>,

    /// Per-coefficient sample mean.
    pub posterior_mean: DVector<f64>,

    /// Per-coefficient sample variance (divisor n).
    pub posterior_var: DVector<f64>,

    /// Fraction of accepted proposals.
    pub acceptance_rate: f64,

    /// Per-coefficient effective sample size.
    pub ess: DVector<f64>,

    /// Feature column names, aligned with the coefficient axis.
    pub columns: Vec<String>,

    /// Prior the samples were drawn under.
    pub mode: FitMode,

    /// Number of pooled chains.
    pub chains: usize,
}

impl PosteriorState {
    /// Summarize a sample set.
    ///
    /// # Panics
    ///
    /// Panics if the sample set is empty.
    pub fn from_samples(samples: SampleSet, columns: Vec<String>, mode: FitMode) -> Self {
        let posterior_mean = column_means(&samples.beta_samples);
        let posterior_var = column_variances(&samples.beta_samples);
        let ess = DVector::from_iterator(
            samples.beta_samples.ncols(),
            samples
                .beta_samples
                .column_iter()
                .map(|c| compute_ess(&c.iter().copied().collect::<Vec<_>>())),
        );

        Self {
            beta_samples: samples.beta_samples,
            sigma2_samples: samples.sigma2_samples,
            posterior_mean,
            posterior_var,
            acceptance_rate: samples.acceptance_rate,
            ess,
            columns,
            mode,
            chains: samples.chains,
        }
    }

    /// Number of coefficients.
    pub fn n_params(&self) -> usize {
        self.posterior_mean.len()
    }

    /// Number of recorded draws.
    pub fn n_samples(&self) -> usize {
        self.beta_samples.nrows()
    }

    /// Mean of the σ² draws.
    pub fn sigma2_mean(&self) -> f64 {
        if self.sigma2_samples.is_empty() {
            return f64::NAN;
        }
        self.sigma2_samples.mean()
    }

    /// Prior for the next round, centred on this round's summary.
    pub fn to_prior(&self, min_variance: f64) -> crate::Result<CoefficientPrior> {
        CoefficientPrior::refine(
            self.posterior_mean.clone(),
            self.posterior_var.clone(),
            min_variance,
        )
    }

    /// KL(self || previous) over the diagonal Gaussian summaries.
    pub fn kl_from(&self, previous: &PosteriorState) -> f64 {
        kl_divergence_diagonal(
            &self.posterior_mean,
            &self.posterior_var,
            &previous.posterior_mean,
            &previous.posterior_var,
        )
    }

    /// Serializable summary without the raw draws.
    pub fn summary(&self) -> PosteriorSummary {
        PosteriorSummary {
            columns: self.columns.clone(),
            mean: self.posterior_mean.iter().copied().collect(),
            variance: self.posterior_var.iter().copied().collect(),
            ess: self.ess.iter().copied().collect(),
            sigma2_mean: self.sigma2_mean(),
            acceptance_rate: self.acceptance_rate,
            n_samples: self.n_samples(),
            chains: self.chains,
        }
    }
}

/// Marginal summary of a [`PosteriorState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSummary {
    /// Feature column names.
    pub columns: Vec<String>,
    /// Per-coefficient mean.
    pub mean: Vec<f64>,
    /// Per-coefficient variance.
    pub variance: Vec<f64>,
    /// Per-coefficient effective sample size.
    pub ess: Vec<f64>,
    /// Mean noise variance.
    pub sigma2_mean: f64,
    /// Fraction of accepted proposals.
    pub acceptance_rate: f64,
    /// Recorded draws.
    pub n_samples: usize,
    /// Pooled chains.
    pub chains: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(rows: &[[f64; 2]]) -> PosteriorState {
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let samples = SampleSet {
            beta_samples: DMatrix::from_row_slice(rows.len(), 2, &flat),
            sigma2_samples: DVector::from_element(rows.len(), 2.0),
            acceptance_rate: 0.3,
            chains: 1,
        };
        PosteriorState::from_samples(samples, vec!["a".into(), "b".into()], FitMode::Bootstrap)
    }

    #[test]
    fn test_summary_moments() {
        let s = state(&[[1.0, 0.0], [3.0, 0.0]]);
        assert_eq!(s.posterior_mean.as_slice(), &[2.0, 0.0]);
        assert_eq!(s.posterior_var.as_slice(), &[1.0, 0.0]);
        assert_eq!(s.sigma2_mean(), 2.0);
        assert_eq!(s.n_samples(), 2);
    }

    #[test]
    fn test_to_prior_floors_stuck_coefficient() {
        let s = state(&[[1.0, 5.0], [3.0, 5.0]]);
        let prior = s.to_prior(1e-10).unwrap();
        assert_eq!(prior.mode(), FitMode::Refine);
        assert_eq!(prior.mean().as_slice(), &[2.0, 5.0]);
        assert_eq!(prior.variance().as_slice(), &[1.0, 1e-10]);
    }

    #[test]
    fn test_kl_from_self_is_zero() {
        let s = state(&[[1.0, 0.0], [3.0, 2.0], [2.0, 1.0]]);
        assert!(s.kl_from(&s).abs() < 1e-12);
    }

    #[test]
    fn test_summary_serializes() {
        let s = state(&[[1.0, 0.0], [3.0, 2.0]]);
        let json = serde_json::to_value(s.summary()).unwrap();
        assert_eq!(json["columns"][1], "b");
        assert_eq!(json["n_samples"], 2);
    }
}
