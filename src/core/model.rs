//! Shared observation data for global and local fits.

use faer::{Col, Mat};

use crate::core::{Family, OptionsError};
use crate::error::{GwrError, Result};

/// Immutable observation set shared by the solver, the calibration loop, and
/// every diagnostic.
///
/// The design matrix is stored with the intercept column already prepended
/// when one is requested, so `k` counts the intercept. The offset defaults to
/// ones and the fixed component to zeros; both always have length `n`.
#[derive(Debug, Clone)]
pub struct ModelCore {
    /// Response, length n.
    pub y: Col<f64>,
    /// Design matrix, n×k.
    pub x: Mat<f64>,
    /// Multiplicative exposure per observation. Only meaningful for the
    /// Poisson family, where the mean is `offset · exp(Xβ + y_fix)`.
    pub offset: Col<f64>,
    /// Fixed additive component of the linear predictor.
    pub y_fix: Col<f64>,
    pub family: Family,
    pub n: usize,
    pub k: usize,
}

impl ModelCore {
    /// Assemble and validate the shared observation set.
    ///
    /// `x` carries the predictors without the intercept; pass
    /// `with_intercept = true` to prepend a column of ones.
    pub fn new(
        y: Col<f64>,
        x: Mat<f64>,
        family: Family,
        offset: Option<Col<f64>>,
        y_fix: Option<Col<f64>>,
        with_intercept: bool,
    ) -> Result<Self> {
        let n = y.nrows();

        if x.nrows() != n {
            return Err(GwrError::DimensionMismatch {
                name: "x",
                got: x.nrows(),
                expected: n,
            });
        }
        if let Some(ref offset) = offset {
            if offset.nrows() != n {
                return Err(GwrError::DimensionMismatch {
                    name: "offset",
                    got: offset.nrows(),
                    expected: n,
                });
            }
            if family != Family::Poisson {
                return Err(OptionsError::OffsetRequiresPoisson.into());
            }
        }
        if let Some(ref y_fix) = y_fix {
            if y_fix.nrows() != n {
                return Err(GwrError::DimensionMismatch {
                    name: "y_fix",
                    got: y_fix.nrows(),
                    expected: n,
                });
            }
        }

        family.validate_response(&y)?;

        let x = if with_intercept {
            let p = x.ncols();
            Mat::from_fn(n, p + 1, |i, j| if j == 0 { 1.0 } else { x[(i, j - 1)] })
        } else {
            x
        };
        let k = x.ncols();

        let offset = offset.unwrap_or_else(|| Col::from_fn(n, |_| 1.0));
        let y_fix = y_fix.unwrap_or_else(|| Col::zeros(n));

        Ok(Self {
            y,
            x,
            offset,
            y_fix,
            family,
            n,
            k,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_xy(n: usize) -> (Col<f64>, Mat<f64>) {
        let y = Col::from_fn(n, |i| 1.0 + i as f64);
        let x = Mat::from_fn(n, 2, |i, j| ((i + 1) * (j + 2)) as f64);
        (y, x)
    }

    #[test]
    fn test_intercept_prepended() {
        let (y, x) = sample_xy(5);
        let core = ModelCore::new(y, x, Family::Gaussian, None, None, true).unwrap();

        assert_eq!(core.k, 3);
        for i in 0..5 {
            assert_eq!(core.x[(i, 0)], 1.0);
        }
    }

    #[test]
    fn test_no_intercept_keeps_columns() {
        let (y, x) = sample_xy(5);
        let core = ModelCore::new(y, x, Family::Gaussian, None, None, false).unwrap();

        assert_eq!(core.k, 2);
        assert!((core.x[(0, 0)] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_defaults_for_offset_and_y_fix() {
        let (y, x) = sample_xy(4);
        let core = ModelCore::new(y, x, Family::Gaussian, None, None, true).unwrap();

        assert!(core.offset.iter().all(|&o| o == 1.0));
        assert!(core.y_fix.iter().all(|&f| f == 0.0));
    }

    #[test]
    fn test_mismatched_rows_rejected() {
        let y = Col::from_fn(4, |i| i as f64);
        let x = Mat::from_fn(5, 2, |i, j| (i + j) as f64);

        let err = ModelCore::new(y, x, Family::Gaussian, None, None, true);
        assert!(matches!(
            err,
            Err(GwrError::DimensionMismatch { name: "x", .. })
        ));
    }

    #[test]
    fn test_offset_rejected_outside_poisson() {
        let (y, x) = sample_xy(4);
        let offset = Col::from_fn(4, |_| 2.0);

        let err = ModelCore::new(y, x, Family::Gaussian, Some(offset), None, true);
        assert!(matches!(err, Err(GwrError::InvalidOptions(_))));
    }

    #[test]
    fn test_offset_accepted_for_poisson() {
        let y = Col::from_fn(4, |i| i as f64);
        let x = Mat::from_fn(4, 1, |i, _| i as f64);
        let offset = Col::from_fn(4, |_| 2.0);

        let core = ModelCore::new(y, x, Family::Poisson, Some(offset), None, true).unwrap();
        assert_eq!(core.offset[0], 2.0);
    }

    #[test]
    fn test_negative_counts_rejected_for_poisson() {
        let y = Col::from_fn(4, |i| i as f64 - 2.0);
        let x = Mat::from_fn(4, 1, |i, _| i as f64);

        let err = ModelCore::new(y, x, Family::Poisson, None, None, true);
        assert!(matches!(err, Err(GwrError::InvalidResponse { .. })));
    }
}
