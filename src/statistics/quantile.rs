//! Percentiles by linear interpolation between order statistics.
//!
//! For a sorted sample x of size n and a percentile p in [0, 100]:
//! ```text
//! h = (n - 1) * p / 100
//! q = x[floor(h)] + (h - floor(h)) * (x[ceil(h)] - x[floor(h)])
//! ```
//!
//! This is Hyndman & Fan Type 7, the default of most numerical libraries, so
//! credible bands computed here agree with the usual `percentile(samples, 2.5)`.
//!
//! # Reference
//!
//! Hyndman, R. J. & Fan, Y. (1996). "Sample quantiles in statistical packages."
//! The American Statistician 50(4):361–365.

/// Compute a single percentile from a mutable slice.
///
/// Uses `select_nth_unstable_by()` for O(n) expected time. The slice is
/// partially reordered as a side effect.
///
/// # Panics
///
/// Panics if `data` is empty or if `p` is outside [0, 100].
pub fn compute_percentile(data: &mut [f64], p: f64) -> f64 {
    assert!(!data.is_empty(), "Cannot compute percentile of empty slice");
    assert!(
        (0.0..=100.0).contains(&p),
        "Percentile must be in [0, 100]"
    );

    let n = data.len();
    if n == 1 {
        return data[0];
    }

    let h = (n - 1) as f64 * p / 100.0;
    let lo = h.floor() as usize;
    let hi = (h.ceil() as usize).min(n - 1);
    let frac = h - lo as f64;

    // Select the upper index first; everything before it is <= its value,
    // so the lower selection only touches the left partition.
    let (_, &mut hi_val, _) = data.select_nth_unstable_by(hi, |a, b| a.total_cmp(b));
    if lo == hi {
        return hi_val;
    }
    let (_, &mut lo_val, _) = data[..hi].select_nth_unstable_by(lo, |a, b| a.total_cmp(b));

    lo_val + frac * (hi_val - lo_val)
}

/// Compute a percentile from data that is already sorted ascending.
///
/// # Panics
///
/// Panics if `sorted` is empty or if `p` is outside [0, 100].
pub fn compute_percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    assert!(!sorted.is_empty(), "Cannot compute percentile of empty slice");
    assert!(
        (0.0..=100.0).contains(&p),
        "Percentile must be in [0, 100]"
    );

    let n = sorted.len();
    let h = (n - 1) as f64 * p / 100.0;
    let lo = h.floor() as usize;
    let hi = (h.ceil() as usize).min(n - 1);
    let frac = h - lo as f64;

    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Lower and upper percentiles of `data`, sorting a scratch copy once.
///
/// Returns `(q_lower, q_upper)`.
pub fn credible_band(data: &[f64], lower: f64, upper: f64) -> (f64, f64) {
    let mut sorted = data.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    (
        compute_percentile_sorted(&sorted, lower),
        compute_percentile_sorted(&sorted, upper),
    )
}
