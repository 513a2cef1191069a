//! Global (non-spatial) generalized linear model.
//!
//! Fits one GLM over all observations with the same IRLS routine the
//! calibration loop uses per location. Serves as the aspatial baseline a
//! locally-weighted model is compared against.
//!
//! # Example
//!
//! ```rust,ignore
//! use gwr_rs::solvers::GlmModel;
//! use gwr_rs::core::Family;
//!
//! let results = GlmModel::new(y, x, Family::Poisson)?.fit()?;
//! println!("deviance = {}", results.deviance());
//! ```

use std::sync::{Arc, OnceLock};

use faer::{Col, Mat};

use crate::core::{Family, ModelCore};
use crate::error::Result;
use crate::solvers::iwls::{iwls, IwlsError, IwlsFit};
use crate::utils::{qr_inverse, weighted_gram};

const GLM_TOLERANCE: f64 = 1.0e-6;
const GLM_MAX_ITERATIONS: usize = 200;
const GLM_RANK_TOLERANCE: f64 = 1.0e-10;

/// Global GLM over the full observation set, no spatial weighting.
#[derive(Debug, Clone)]
pub struct GlmModel {
    core: Arc<ModelCore>,
    sigma2_v1: bool,
}

impl GlmModel {
    /// Gaussian-style defaults: intercept included, no offset, no fixed
    /// component, `n - k` variance denominator.
    pub fn new(y: Col<f64>, x: Mat<f64>, family: Family) -> Result<Self> {
        Self::with_options(y, x, family, None, None, false, true)
    }

    /// Fully specified constructor. `x` excludes the intercept column;
    /// `sigma2_v1` switches the canonical variance denominator from `n - k`
    /// to `n`.
    pub fn with_options(
        y: Col<f64>,
        x: Mat<f64>,
        family: Family,
        offset: Option<Col<f64>>,
        y_fix: Option<Col<f64>>,
        sigma2_v1: bool,
        with_intercept: bool,
    ) -> Result<Self> {
        let core = ModelCore::new(y, x, family, offset, y_fix, with_intercept)?;
        Ok(Self {
            core: Arc::new(core),
            sigma2_v1,
        })
    }

    /// Observation set shared with the results.
    pub fn core(&self) -> &ModelCore {
        &self.core
    }

    /// Fit with the default tolerance and iteration cap.
    pub fn fit(&self) -> Result<GlmResults> {
        self.fit_with(GLM_TOLERANCE, GLM_MAX_ITERATIONS)
    }

    /// Fit with explicit convergence controls.
    pub fn fit_with(&self, tolerance: f64, max_iterations: usize) -> Result<GlmResults> {
        let fit = iwls(
            &self.core,
            None,
            tolerance,
            max_iterations,
            GLM_RANK_TOLERANCE,
        )?;
        Ok(GlmResults::new(
            Arc::clone(&self.core),
            self.sigma2_v1,
            fit,
        ))
    }
}

/// Fitted global GLM with lazily cached diagnostics.
///
/// Every derived quantity is computed once on first access and memoized;
/// accessors that can fail (covariance of a deficient design) recompute on
/// the next call instead of caching the failure.
#[derive(Debug)]
pub struct GlmResults {
    core: Arc<ModelCore>,
    sigma2_v1: bool,
    /// Coefficients, length k.
    pub beta: Col<f64>,
    /// Fitted mean response.
    pub predy: Col<f64>,
    /// Regression part of the linear predictor, Xβ only.
    pub linear_predictor: Col<f64>,
    /// IRLS weights of the final solve.
    pub w: Col<f64>,
    /// Response residuals y - predy.
    pub u: Col<f64>,
    /// IRLS iterations run.
    pub iterations: usize,
    utu: OnceLock<f64>,
    sig2n: OnceLock<f64>,
    sig2n_k: OnceLock<f64>,
    vm: OnceLock<Mat<f64>>,
    std_err: OnceLock<Col<f64>>,
    t_values: OnceLock<Col<f64>>,
    deviance: OnceLock<f64>,
}

impl GlmResults {
    fn new(core: Arc<ModelCore>, sigma2_v1: bool, fit: IwlsFit) -> Self {
        let u = Col::from_fn(core.n, |i| core.y[i] - fit.mu[i]);
        Self {
            core,
            sigma2_v1,
            beta: fit.beta,
            predy: fit.mu,
            linear_predictor: fit.linear_predictor,
            w: fit.weights,
            u,
            iterations: fit.iterations,
            utu: OnceLock::new(),
            sig2n: OnceLock::new(),
            sig2n_k: OnceLock::new(),
            vm: OnceLock::new(),
            std_err: OnceLock::new(),
            t_values: OnceLock::new(),
            deviance: OnceLock::new(),
        }
    }

    /// Observation set the model was fitted on.
    pub fn core(&self) -> &ModelCore {
        &self.core
    }

    /// Residual sum of squares.
    pub fn utu(&self) -> f64 {
        *self
            .utu
            .get_or_init(|| self.u.iter().map(|&u| u * u).sum())
    }

    /// IRLS-weighted residual variance with denominator n.
    pub fn sig2n(&self) -> f64 {
        *self.sig2n.get_or_init(|| {
            let weighted: f64 = (0..self.core.n)
                .map(|i| self.w[i] * self.u[i] * self.u[i])
                .sum();
            weighted / self.core.n as f64
        })
    }

    /// IRLS-weighted residual variance with denominator n - k.
    pub fn sig2n_k(&self) -> f64 {
        *self.sig2n_k.get_or_init(|| {
            let weighted: f64 = (0..self.core.n)
                .map(|i| self.w[i] * self.u[i] * self.u[i])
                .sum();
            weighted / (self.core.n - self.core.k) as f64
        })
    }

    /// Canonical residual variance, selected by the `sigma2_v1` flag.
    pub fn sig2(&self) -> f64 {
        if self.sigma2_v1 {
            self.sig2n()
        } else {
            self.sig2n_k()
        }
    }

    /// Coefficient covariance matrix, k×k.
    ///
    /// Gaussian models scale the unweighted `(XᵗX)⁻¹` by the canonical
    /// variance; the other families invert the Fisher information `XᵗWX`
    /// built from the final IRLS weights.
    pub fn vm(&self) -> Result<&Mat<f64>> {
        if let Some(vm) = self.vm.get() {
            return Ok(vm);
        }
        let vm = if self.core.family.estimates_dispersion() {
            let unit = Col::from_fn(self.core.n, |_| 1.0);
            let gram = weighted_gram(&self.core.x, &unit);
            let inverse = qr_inverse(&gram, GLM_RANK_TOLERANCE).ok_or(IwlsError::Singular)?;
            let sig2 = self.sig2();
            Mat::from_fn(self.core.k, self.core.k, |i, j| sig2 * inverse[(i, j)])
        } else {
            let gram = weighted_gram(&self.core.x, &self.w);
            qr_inverse(&gram, GLM_RANK_TOLERANCE).ok_or(IwlsError::Singular)?
        };
        Ok(self.vm.get_or_init(|| vm))
    }

    /// Standard errors of the coefficients.
    pub fn std_err(&self) -> Result<&Col<f64>> {
        if let Some(se) = self.std_err.get() {
            return Ok(se);
        }
        let vm = self.vm()?;
        let se = Col::from_fn(self.core.k, |j| vm[(j, j)].sqrt());
        Ok(self.std_err.get_or_init(|| se))
    }

    /// Coefficient t statistics, β / se(β).
    pub fn t_values(&self) -> Result<&Col<f64>> {
        if let Some(t) = self.t_values.get() {
            return Ok(t);
        }
        let se = self.std_err()?;
        let t = Col::from_fn(self.core.k, |j| self.beta[j] / se[j]);
        Ok(self.t_values.get_or_init(|| t))
    }

    /// Residual deviance under the model family.
    pub fn deviance(&self) -> f64 {
        *self
            .deviance
            .get_or_init(|| self.core.family.deviance(&self.core.y, &self.predy))
    }
}
