//! Geographically weighted regression model and calibration loop.
//!
//! # Example
//!
//! ```rust,ignore
//! use gwr_rs::core::GwrOptions;
//! use gwr_rs::kernel::Bandwidth;
//! use gwr_rs::model::GwrModel;
//!
//! let options = GwrOptions::new(Bandwidth::Adaptive(10));
//! let model = GwrModel::new(coords, y, x, options)?;
//! let results = model.fit()?;
//! println!("effective parameters: {:.2}", results.tr_s());
//! ```

use std::sync::Arc;

use faer::{Col, Mat};
use rayon::prelude::*;

use crate::core::{GwrOptions, ModelCore};
use crate::error::{GwrError, Result};
use crate::kernel::weight_matrix;
use crate::model::results::GwrResults;
use crate::solvers::{iwls, IwlsError};

/// One locally weighted GLM per calibration location.
///
/// Construction validates the options and data shapes and builds the dense
/// spatial weight matrix; [`fit`](GwrModel::fit) runs the calibration loop.
#[derive(Debug)]
pub struct GwrModel {
    core: Arc<ModelCore>,
    options: GwrOptions,
    coords: Mat<f64>,
    w_matrix: Mat<f64>,
}

/// Outputs of one location's solve, written to row `i` of the aggregates.
struct LocationFit {
    beta: Col<f64>,
    predy: f64,
    linear_predictor: f64,
    weight: f64,
    s_row: Col<f64>,
    cct_row: Col<f64>,
    iterations: usize,
}

impl GwrModel {
    /// Build a model from coordinates, response, and design matrix.
    pub fn new(coords: Mat<f64>, y: Col<f64>, x: Mat<f64>, options: GwrOptions) -> Result<Self> {
        Self::with_data(coords, y, x, None, None, options)
    }

    /// Build a model with an offset (Poisson exposure) and/or a fixed
    /// additive component of the linear predictor.
    pub fn with_data(
        coords: Mat<f64>,
        y: Col<f64>,
        x: Mat<f64>,
        offset: Option<Col<f64>>,
        y_fix: Option<Col<f64>>,
        options: GwrOptions,
    ) -> Result<Self> {
        options.validate()?;

        let core = ModelCore::new(y, x, options.family, offset, y_fix, options.with_intercept)?;

        if coords.nrows() != core.n {
            return Err(GwrError::DimensionMismatch {
                name: "coords",
                got: coords.nrows(),
                expected: core.n,
            });
        }

        let w_matrix = weight_matrix(&coords, options.kernel, options.bandwidth)?;
        log::debug!(
            "Built {}x{} spatial weight matrix ({} kernel, bandwidth {})",
            core.n,
            core.n,
            options.kernel,
            options.bandwidth
        );

        Ok(Self {
            core: Arc::new(core),
            options,
            coords,
            w_matrix,
        })
    }

    /// Shared observation data.
    pub fn core(&self) -> &ModelCore {
        &self.core
    }

    /// Calibration options.
    pub fn options(&self) -> &GwrOptions {
        &self.options
    }

    /// Calibration locations, n×2.
    pub fn coords(&self) -> &Mat<f64> {
        &self.coords
    }

    /// Dense spatial weight matrix, row i holding the kernel weights of all
    /// observations relative to location i.
    pub fn w_matrix(&self) -> &Mat<f64> {
        &self.w_matrix
    }

    /// Run the calibration loop: one weighted IRLS fit per location.
    ///
    /// Locations are solved in parallel; each reads only shared immutable
    /// inputs and produces its own row of every aggregate. The first failing
    /// location aborts the fit, so the returned results are always fully
    /// populated.
    pub fn fit(&self) -> Result<GwrResults> {
        let n = self.core.n;
        let k = self.core.k;

        log::info!(
            "Calibrating {} local {} fits ({} kernel, bandwidth {})",
            n,
            self.core.family,
            self.options.kernel,
            self.options.bandwidth
        );

        let fits: Vec<LocationFit> = (0..n)
            .into_par_iter()
            .map(|location| self.fit_location(location))
            .collect::<Result<_>>()?;

        let mut params = Mat::zeros(n, k);
        let mut predy = Col::zeros(n);
        let mut linear_predictor = Col::zeros(n);
        let mut w = Col::zeros(n);
        let mut s = Mat::zeros(n, n);
        let mut cct = Mat::zeros(n, k);
        let mut most_iterations = 0;

        for (i, fit) in fits.into_iter().enumerate() {
            for a in 0..k {
                params[(i, a)] = fit.beta[a];
                cct[(i, a)] = fit.cct_row[a];
            }
            for j in 0..n {
                s[(i, j)] = fit.s_row[j];
            }
            predy[i] = fit.predy;
            linear_predictor[i] = fit.linear_predictor;
            w[i] = fit.weight;
            most_iterations = most_iterations.max(fit.iterations);
        }

        let results = GwrResults::new(
            Arc::clone(&self.core),
            self.w_matrix.clone(),
            self.options.sigma2_v1,
            params,
            predy,
            linear_predictor,
            w,
            s,
            cct,
        );
        log::info!(
            "Calibration complete: n={}, k={}, effective parameters {:.3}, sigma2 {:.6}, max IRLS iterations {}",
            n,
            k,
            results.tr_s(),
            results.sig2().unwrap_or(f64::NAN),
            most_iterations
        );
        Ok(results)
    }

    /// Solve one location and derive its hat-matrix and variance rows.
    fn fit_location(&self, location: usize) -> Result<LocationFit> {
        let n = self.core.n;
        let k = self.core.k;
        let spatial = Col::from_fn(n, |j| self.w_matrix[(location, j)]);

        let fit = iwls(
            &self.core,
            Some(&spatial),
            self.options.tolerance,
            self.options.max_iterations,
            self.options.rank_tolerance,
        )
        .map_err(|err| match err {
            IwlsError::Singular => GwrError::SingularMatrix { location },
            IwlsError::NotConverged { iterations } => GwrError::ConvergenceFailed {
                iterations,
                location,
            },
        })?;

        for (column, value) in fit.beta.iter().enumerate() {
            if !value.is_finite() {
                return Err(GwrError::NonFinite {
                    what: "coefficient",
                    location,
                    column,
                });
            }
        }

        // S[i, j] = x[i, ·] · C[·, j]: observation j's influence on the fit
        // at location i.
        let s_row = Col::from_fn(n, |j| {
            (0..k)
                .map(|a| self.core.x[(location, a)] * fit.c_matrix[(a, j)])
                .sum::<f64>()
        });
        for (column, value) in s_row.iter().enumerate() {
            if !value.is_finite() {
                return Err(GwrError::NonFinite {
                    what: "hat matrix entry",
                    location,
                    column,
                });
            }
        }

        // CCT[i, ·] = diag(C·Cᵗ), the variance block before sigma2 scaling.
        let cct_row = Col::from_fn(k, |a| {
            (0..n)
                .map(|j| fit.c_matrix[(a, j)] * fit.c_matrix[(a, j)])
                .sum::<f64>()
        });

        Ok(LocationFit {
            beta: fit.beta,
            predy: fit.mu[location],
            linear_predictor: fit.linear_predictor[location],
            weight: fit.weights[location],
            s_row,
            cct_row,
            iterations: fit.iterations,
        })
    }
}
