//! Hat-matrix traces and effective-degrees-of-freedom variance estimators.
//!
//! The weighted trace of the hat matrix plays the role the parameter count
//! plays in a global model: it measures how many effective parameters the
//! ensemble of local fits spends. The variance estimators here divide the
//! residual sum of squares by trace-corrected degrees of freedom.

use faer::{Col, Mat};

use crate::error::{GwrError, Result};

/// Weighted trace of the hat matrix, Σᵢ S[i,i]·w[i]: the effective number of
/// parameters. `w` holds the final IRLS weights, all ones for Gaussian fits.
pub fn trace_s(s: &Mat<f64>, w: &Col<f64>) -> f64 {
    (0..s.nrows()).map(|i| s[(i, i)] * w[i]).sum()
}

/// Trace of Sᵗ·diag(w)·S·diag(w), the second-order companion to [`trace_s`].
pub fn trace_sts(s: &Mat<f64>, w: &Col<f64>) -> f64 {
    let n = s.nrows();
    let mut total = 0.0;
    for a in 0..n {
        for b in 0..n {
            let entry = s[(b, a)];
            total += w[a] * w[b] * entry * entry;
        }
    }
    total
}

/// Residual variance with the first-order correction, utu / (n − tr(S)).
pub fn sigma2_v1(utu: f64, n: usize, tr_s: f64) -> f64 {
    utu / (n as f64 - tr_s)
}

/// Residual variance with the second-order correction,
/// utu / (n − 2·tr(S) + tr(SᵗS)).
///
/// Fails when the corrected degrees of freedom are not positive, which
/// happens when the hat matrix absorbs (nearly) every observation.
pub fn sigma2_v1v2(utu: f64, n: usize, tr_s: f64, tr_sts: f64) -> Result<f64> {
    let dof = n as f64 - 2.0 * tr_s + tr_sts;
    if dof <= 0.0 {
        return Err(GwrError::DegenerateDegreesOfFreedom { value: dof, n });
    }
    Ok(utu / dof)
}

/// Maximum-likelihood residual variance, utu / n.
pub fn sigma2_ml(utu: f64, n: usize) -> f64 {
    utu / n as f64
}
