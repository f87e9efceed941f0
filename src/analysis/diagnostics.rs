//! Chain diagnostics and round-to-round posterior movement.

use nalgebra::DVector;

/// Effective sample size of a chain, accounting for autocorrelation.
///
/// ESS = N / (1 + 2 * Σ_k ρ_k)
///
/// The sum runs over lags 1..=min(50, N/2) and stops at the first lag whose
/// autocorrelation drops below 0.05.
pub fn compute_ess(chain: &[f64]) -> f64 {
    let n = chain.len();
    if n < 2 {
        return n as f64;
    }

    let mean: f64 = chain.iter().sum::<f64>() / n as f64;
    let var: f64 = chain.iter().map(|&x| (x - mean) * (x - mean)).sum::<f64>() / n as f64;

    if var < 1e-12 {
        return n as f64;
    }

    let mut sum_rho = 0.0;
    for k in 1..=50.min(n / 2) {
        let rho_k = autocorrelation(chain, k, mean, var);
        if rho_k < 0.05 {
            break;
        }
        sum_rho += rho_k;
    }

    n as f64 / (1.0 + 2.0 * sum_rho)
}

/// Lag-k autocorrelation.
fn autocorrelation(chain: &[f64], k: usize, mean: f64, var: f64) -> f64 {
    let n = chain.len();
    if k >= n {
        return 0.0;
    }

    let cov: f64 = (0..(n - k))
        .map(|i| (chain[i] - mean) * (chain[i + k] - mean))
        .sum::<f64>()
        / (n - k) as f64;

    cov / var
}

/// KL(p || q) between two diagonal Gaussians.
///
/// ```text
/// KL = ½ Σ_j [ v_p/v_q + (μ_q - μ_p)²/v_q - 1 + ln(v_q/v_p) ]
/// ```
///
/// Tracks how far one round's posterior summary moved from the previous
/// round's. Returns `f64::INFINITY` if any variance is non-positive or the
/// dimensions differ.
pub fn kl_divergence_diagonal(
    p_mean: &DVector<f64>,
    p_var: &DVector<f64>,
    q_mean: &DVector<f64>,
    q_var: &DVector<f64>,
) -> f64 {
    let k = p_mean.len();
    if p_var.len() != k || q_mean.len() != k || q_var.len() != k {
        return f64::INFINITY;
    }

    let mut kl = 0.0;
    for j in 0..k {
        let (vp, vq) = (p_var[j], q_var[j]);
        if !(vp > 0.0 && vq > 0.0) {
            return f64::INFINITY;
        }
        let d = q_mean[j] - p_mean[j];
        kl += vp / vq + d * d / vq - 1.0 + (vq / vp).ln();
    }
    0.5 * kl
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ess_independent_chain_is_close_to_n() {
        // Alternating signs: negative lag-1 autocorrelation, loop exits immediately
        let chain: Vec<f64> = (0..1000).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert_eq!(compute_ess(&chain), 1000.0);
    }

    #[test]
    fn test_ess_sticky_chain_is_small() {
        // Blocks of 50 identical values
        let chain: Vec<f64> = (0..1000).map(|i| ((i / 50) % 2) as f64).collect();
        let ess = compute_ess(&chain);
        assert!(ess < 100.0, "ESS of a sticky chain was {}", ess);
    }

    #[test]
    fn test_ess_constant_chain() {
        assert_eq!(compute_ess(&[3.0; 10]), 10.0);
        assert_eq!(compute_ess(&[1.0]), 1.0);
    }

    #[test]
    fn test_kl_identical_is_zero() {
        let m = DVector::from_row_slice(&[1.0, -2.0]);
        let v = DVector::from_row_slice(&[0.5, 2.0]);
        assert!(kl_divergence_diagonal(&m, &v, &m, &v).abs() < 1e-12);
    }

    #[test]
    fn test_kl_mean_shift() {
        // Unit variances, shift of 2 in one coordinate: KL = ½ · 4
        let p = DVector::from_row_slice(&[0.0, 0.0]);
        let q = DVector::from_row_slice(&[2.0, 0.0]);
        let v = DVector::from_row_slice(&[1.0, 1.0]);
        assert!((kl_divergence_diagonal(&p, &v, &q, &v) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_kl_degenerate_is_infinite() {
        let m = DVector::from_row_slice(&[0.0]);
        let zero = DVector::from_row_slice(&[0.0]);
        let one = DVector::from_row_slice(&[1.0]);
        assert!(kl_divergence_diagonal(&m, &zero, &m, &one).is_infinite());
        assert!(kl_divergence_diagonal(&m, &one, &DVector::zeros(2), &one).is_infinite());
    }
}
