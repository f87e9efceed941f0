//! Statistical primitives.
//!
//! - Percentiles with linear interpolation, used for credible bands
//! - Column means / variances of sample matrices (the posterior summary)
//! - The logistic sigmoid used by the uncertainty score

mod moments;
mod quantile;

pub use moments::{column_means, column_variances, sigmoid};
pub use quantile::{compute_percentile, compute_percentile_sorted, credible_band};
