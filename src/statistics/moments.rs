//! Column moments of sample matrices and the logistic link.

use nalgebra::{DMatrix, DVector};

/// Mean of each column (one entry per parameter).
///
/// # Panics
///
/// Panics if `samples` has no rows.
pub fn column_means(samples: &DMatrix<f64>) -> DVector<f64> {
    assert!(samples.nrows() > 0, "Cannot compute moments of empty sample set");
    let n = samples.nrows() as f64;
    DVector::from_iterator(samples.ncols(), samples.column_iter().map(|c| c.sum() / n))
}

/// Population variance (divisor n) of each column.
///
/// The divisor matches the moment summary carried between rounds: the
/// empirical second central moment of the chain, not an unbiased estimate.
///
/// # Panics
///
/// Panics if `samples` has no rows.
pub fn column_variances(samples: &DMatrix<f64>) -> DVector<f64> {
    let means = column_means(samples);
    let n = samples.nrows() as f64;
    DVector::from_iterator(
        samples.ncols(),
        samples
            .column_iter()
            .zip(means.iter())
            .map(|(c, &m)| c.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / n),
    )
}

/// Logistic sigmoid `1 / (1 + e^-z)`.
///
/// Evaluated in a form that does not overflow for large |z|.
#[inline]
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
