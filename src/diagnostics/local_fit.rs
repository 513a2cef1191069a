//! Spatially local goodness-of-fit summaries.
//!
//! Each quantity weights every observation by row i of the spatial weight
//! matrix, giving one value per calibration location.

use faer::{Col, Mat};

use crate::core::Family;

/// Spatially weighted mean of y at each location,
/// Σⱼ W[i,j]·y[j] / Σⱼ W[i,j]·offset[j].
pub fn y_bar(w_matrix: &Mat<f64>, y: &Col<f64>, offset: &Col<f64>) -> Col<f64> {
    let n = y.nrows();
    Col::from_fn(n, |i| {
        let mut weighted_y = 0.0;
        let mut weighted_offset = 0.0;
        for j in 0..n {
            weighted_y += w_matrix[(i, j)] * y[j];
            weighted_offset += w_matrix[(i, j)] * offset[j];
        }
        weighted_y / weighted_offset
    })
}

/// Geographically weighted total sum of squares per location,
/// Σⱼ W[i,j]·(y[j] − y_bar[i])².
pub fn tss(w_matrix: &Mat<f64>, y: &Col<f64>, y_bar: &Col<f64>) -> Col<f64> {
    let n = y.nrows();
    Col::from_fn(n, |i| {
        (0..n)
            .map(|j| {
                let dev = y[j] - y_bar[i];
                w_matrix[(i, j)] * dev * dev
            })
            .sum()
    })
}

/// Geographically weighted residual sum of squares per location,
/// Σⱼ W[i,j]·u[j]².
pub fn rss(w_matrix: &Mat<f64>, u: &Col<f64>) -> Col<f64> {
    let n = u.nrows();
    Col::from_fn(n, |i| (0..n).map(|j| w_matrix[(i, j)] * u[j] * u[j]).sum())
}

/// Local R², (TSS − RSS) / TSS.
pub fn local_r2(tss: &Col<f64>, rss: &Col<f64>) -> Col<f64> {
    Col::from_fn(tss.nrows(), |i| (tss[i] - rss[i]) / tss[i])
}

/// Local share of deviance explained, the GLM analogue of local R²:
/// 1 − Σⱼ W[i,j]·dev(y[j], predy[j]) / Σⱼ W[i,j]·dev(y[j], y_bar[i]).
///
/// Undefined for the Gaussian family; every entry is NaN there.
pub fn p_dev(
    family: Family,
    w_matrix: &Mat<f64>,
    y: &Col<f64>,
    predy: &Col<f64>,
    y_bar: &Col<f64>,
) -> Col<f64> {
    let n = y.nrows();
    if family == Family::Gaussian {
        return Col::from_fn(n, |_| f64::NAN);
    }

    Col::from_fn(n, |i| {
        let mut residual_dev = 0.0;
        let mut null_dev = 0.0;
        for j in 0..n {
            residual_dev += w_matrix[(i, j)] * family.unit_deviance(y[j], predy[j]);
            null_dev += w_matrix[(i, j)] * family.unit_deviance(y[j], y_bar[i]);
        }
        1.0 - residual_dev / null_dev
    })
}
