//! Residual and influence measures per calibration location.

use faer::{Col, Mat};

use crate::core::Family;

/// Leverage: the hat-matrix diagonal, S[i,i].
pub fn influence(s: &Mat<f64>) -> Col<f64> {
    Col::from_fn(s.nrows(), |i| s[(i, i)])
}

/// Standardized residuals, u[i] / sqrt(sig2·(1 − leverage[i])).
pub fn standardized_residuals(u: &Col<f64>, influence: &Col<f64>, sig2: f64) -> Col<f64> {
    Col::from_fn(u.nrows(), |i| {
        u[i] / (sig2 * (1.0 - influence[i])).sqrt()
    })
}

/// Cook's distance with tr(S) standing in for the parameter count,
/// std_res[i]²·leverage[i] / (tr(S)·(1 − leverage[i])).
pub fn cooks_d(std_res: &Col<f64>, influence: &Col<f64>, tr_s: f64) -> Col<f64> {
    Col::from_fn(std_res.nrows(), |i| {
        std_res[i] * std_res[i] * influence[i] / (tr_s * (1.0 - influence[i]))
    })
}

/// Coefficient standard errors from the per-location variance blocks.
///
/// Poisson and Binomial fits embed their variance scale in CCT already;
/// the Gaussian family scales by the canonical residual variance first.
pub fn bse(cct: &Mat<f64>, family: Family, sig2: f64) -> Mat<f64> {
    match family {
        Family::Poisson | Family::Binomial => {
            Mat::from_fn(cct.nrows(), cct.ncols(), |i, j| cct[(i, j)].sqrt())
        }
        Family::Gaussian => {
            Mat::from_fn(cct.nrows(), cct.ncols(), |i, j| (cct[(i, j)] * sig2).sqrt())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_influence_extracts_diagonal() {
        let s = Mat::from_fn(3, 3, |i, j| if i == j { 0.2 * (i + 1) as f64 } else { 0.05 });
        let influ = influence(&s);

        assert!((influ[0] - 0.2).abs() < 1e-12);
        assert!((influ[1] - 0.4).abs() < 1e-12);
        assert!((influ[2] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_standardized_residuals_scale() {
        let u = Col::from_fn(2, |i| (i + 1) as f64);
        let influ = Col::from_fn(2, |_| 0.5);
        let sig2 = 2.0;

        // denominator = sqrt(2·0.5) = 1
        let std_res = standardized_residuals(&u, &influ, sig2);
        assert!((std_res[0] - 1.0).abs() < 1e-12);
        assert!((std_res[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_cooks_d_hand_computed() {
        let std_res = Col::from_fn(1, |_| 2.0);
        let influ = Col::from_fn(1, |_| 0.5);

        // 4·0.5 / (4·0.5) = 1
        let d = cooks_d(&std_res, &influ, 4.0);
        assert!((d[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_bse_gaussian_scales_by_sig2() {
        let cct = Mat::from_fn(2, 2, |_, _| 4.0);

        let gaussian = bse(&cct, Family::Gaussian, 0.25);
        let poisson = bse(&cct, Family::Poisson, 0.25);

        assert!((gaussian[(0, 0)] - 1.0).abs() < 1e-12);
        assert!((poisson[(0, 0)] - 2.0).abs() < 1e-12);
    }
}
