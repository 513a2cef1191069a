//! Multiple-testing corrections for local coefficient significance.
//!
//! Local fits reuse the same observations across locations, which inflates
//! the family-wise error rate of naive per-location t tests. The correction
//! shrinks each significance level by k/pe, where pe = 2·tr(S) − tr(SᵗS) is
//! the effective number of parameters spent by the ensemble of fits.

use faer::Mat;
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{GwrError, Result};

/// Corrected significance levels for the 90%, 95%, and 99% confidence
/// levels: alpha·k/pe.
///
/// Fails when pe = 2·tr(S) − tr(SᵗS) is not positive; no meaningful critical
/// value exists then.
pub fn adj_alpha(k: usize, tr_s: f64, tr_sts: f64, n: usize) -> Result<[f64; 3]> {
    let pe = 2.0 * tr_s - tr_sts;
    if pe <= 0.0 {
        return Err(GwrError::DegenerateDegreesOfFreedom { value: pe, n });
    }
    let k = k as f64;
    Ok([0.1 * k / pe, 0.05 * k / pe, 0.001 * k / pe])
}

/// Two-sided critical t value at n − 1 degrees of freedom.
pub fn critical_tval(alpha: f64, n: usize) -> f64 {
    let half = alpha.abs() / 2.0;
    StudentsT::new(0.0, 1.0, (n - 1) as f64)
        .map(|dist| dist.inverse_cdf(1.0 - half))
        .unwrap_or(f64::NAN)
}

/// Zero out every t value whose magnitude falls below the critical value,
/// leaving only significant local estimates.
pub fn filter_tvals(t_values: &Mat<f64>, critical: f64) -> Mat<f64> {
    Mat::from_fn(t_values.nrows(), t_values.ncols(), |i, j| {
        let t = t_values[(i, j)];
        if t.abs() < critical {
            0.0
        } else {
            t
        }
    })
}
