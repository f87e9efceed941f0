//! Credible-band width of sigmoid-transformed predictions per condition.
//!
//! For a condition row `x` and posterior draws `β⁽¹⁾..β⁽ᴺ⁾`:
//!
//! ```text
//! p⁽ˢ⁾  = sigmoid(β⁽ˢ⁾ · x)
//! width = q97.5(p) - q2.5(p)
//! ```
//!
//! The coefficients come from a linear regression on reaction time, so `β · x`
//! is a predicted reaction time, not a log-odds. Pushing it through a sigmoid
//! does not yield a calibrated probability; with millisecond-scale targets
//! most predictions saturate near 1 and the widths mostly reflect the
//! coefficients that sit near zero. The score is kept as a heuristic ranking
//! of where the posterior is least settled. Whether the intended model was a
//! logistic regression on accuracy is an open question.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::constants::{CREDIBLE_LOWER, CREDIBLE_UPPER};
use crate::design::DesignEncoder;
use crate::error::{EncodingError, Result};
use crate::statistics::{credible_band, sigmoid};
use crate::types::FactorLevels;

/// 95% credible band of the sigmoid-transformed prediction for one condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyScore {
    /// 2.5th percentile.
    pub lower: f64,
    /// 97.5th percentile.
    pub upper: f64,
}

impl UncertaintyScore {
    /// `upper - lower`.
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Score every candidate row against the posterior draws.
///
/// Candidates are encoded with the same encoder (and therefore the same
/// reference levels and column order) as the training data. One score is
/// returned per candidate, in input order.
pub fn score_uncertainty<T: FactorLevels>(
    encoder: &DesignEncoder,
    candidates: &[T],
    beta_samples: &DMatrix<f64>,
) -> Result<Vec<UncertaintyScore>> {
    let x = encoder.encode_features(candidates)?;
    if beta_samples.ncols() != x.ncols() {
        return Err(EncodingError::ColumnMismatch {
            expected: x.ncols(),
            got: beta_samples.ncols(),
        }
        .into());
    }
    if beta_samples.nrows() == 0 {
        return Err(crate::LoopError::numeric("no posterior draws to score against"));
    }

    // n_samples × n_candidates
    let predictions = (beta_samples * x.transpose()).map(sigmoid);

    Ok(predictions
        .column_iter()
        .map(|column| {
            let draws: Vec<f64> = column.iter().copied().collect();
            let (lower, upper) = credible_band(&draws, CREDIBLE_LOWER, CREDIBLE_UPPER);
            UncertaintyScore { lower, upper }
        })
        .collect())
}

/// Index and score of the candidate with the widest credible band.
///
/// Ties go to the earliest candidate.
pub fn select_max_uncertainty<T: FactorLevels>(
    encoder: &DesignEncoder,
    candidates: &[T],
    beta_samples: &DMatrix<f64>,
) -> Result<(usize, UncertaintyScore)> {
    let scores = score_uncertainty(encoder, candidates, beta_samples)?;
    let widths: Vec<f64> = scores.iter().map(UncertaintyScore::width).collect();
    let index =
        first_argmax(&widths).ok_or_else(|| crate::LoopError::numeric("every uncertainty width is NaN"))?;
    Ok((index, scores[index]))
}

/// First index of the maximum; NaN entries never win.
fn first_argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
