//! Fitted GWR aggregate and its lazily cached diagnostics.

use std::sync::{Arc, OnceLock};

use faer::{Col, Mat};

use crate::core::ModelCore;
use crate::diagnostics;
use crate::error::Result;
use crate::inference;

/// Per-location outputs of the calibration loop plus every hat-matrix
/// diagnostic, each computed once on first access and memoized.
///
/// The aggregate is immutable, so caches never invalidate. Accessors that can
/// fail (degenerate effective degrees of freedom, most often from a bandwidth
/// that absorbs nearly every observation into every local fit) recompute on
/// the next call instead of caching the failure.
#[derive(Debug)]
pub struct GwrResults {
    core: Arc<ModelCore>,
    w_matrix: Mat<f64>,
    sigma2_v1: bool,
    /// Local coefficients, n×k; row i belongs to calibration location i.
    pub params: Mat<f64>,
    /// Fitted mean response at each location's own observation.
    pub predy: Col<f64>,
    /// Regression part of the linear predictor at each location, Xβᵢ only.
    pub linear_predictor: Col<f64>,
    /// Final IRLS weight of each observation in its own local fit.
    pub w: Col<f64>,
    /// Hat matrix, n×n; S[i,j] is observation j's influence on the fit at
    /// location i.
    pub s: Mat<f64>,
    /// diag(CᵢCᵢᵗ) per location, n×k; coefficient variance before sigma2
    /// scaling.
    pub cct: Mat<f64>,
    /// Response residuals y - predy.
    pub u: Col<f64>,
    utu: OnceLock<f64>,
    tr_s: OnceLock<f64>,
    tr_sts: OnceLock<f64>,
    y_bar: OnceLock<Col<f64>>,
    tss: OnceLock<Col<f64>>,
    rss: OnceLock<Col<f64>>,
    local_r2: OnceLock<Col<f64>>,
    influence: OnceLock<Col<f64>>,
    std_res: OnceLock<Col<f64>>,
    cooks_d: OnceLock<Col<f64>>,
    bse: OnceLock<Mat<f64>>,
    t_values: OnceLock<Mat<f64>>,
    p_dev: OnceLock<Col<f64>>,
    adj_alpha: OnceLock<[f64; 3]>,
}

impl GwrResults {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        core: Arc<ModelCore>,
        w_matrix: Mat<f64>,
        sigma2_v1: bool,
        params: Mat<f64>,
        predy: Col<f64>,
        linear_predictor: Col<f64>,
        w: Col<f64>,
        s: Mat<f64>,
        cct: Mat<f64>,
    ) -> Self {
        let u = Col::from_fn(core.n, |i| core.y[i] - predy[i]);
        Self {
            core,
            w_matrix,
            sigma2_v1,
            params,
            predy,
            linear_predictor,
            w,
            s,
            cct,
            u,
            utu: OnceLock::new(),
            tr_s: OnceLock::new(),
            tr_sts: OnceLock::new(),
            y_bar: OnceLock::new(),
            tss: OnceLock::new(),
            rss: OnceLock::new(),
            local_r2: OnceLock::new(),
            influence: OnceLock::new(),
            std_res: OnceLock::new(),
            cooks_d: OnceLock::new(),
            bse: OnceLock::new(),
            t_values: OnceLock::new(),
            p_dev: OnceLock::new(),
            adj_alpha: OnceLock::new(),
        }
    }

    /// Observation set the model was calibrated on.
    pub fn core(&self) -> &ModelCore {
        &self.core
    }

    /// Spatial weight matrix used by the calibration loop.
    pub fn w_matrix(&self) -> &Mat<f64> {
        &self.w_matrix
    }

    /// Residual sum of squares.
    pub fn utu(&self) -> f64 {
        *self
            .utu
            .get_or_init(|| self.u.iter().map(|&u| u * u).sum())
    }

    /// Weighted trace of the hat matrix, the effective number of parameters.
    pub fn tr_s(&self) -> f64 {
        *self
            .tr_s
            .get_or_init(|| diagnostics::trace_s(&self.s, &self.w))
    }

    /// trace(Sᵗ·diag(w)·S·diag(w)).
    pub fn tr_sts(&self) -> f64 {
        *self
            .tr_sts
            .get_or_init(|| diagnostics::trace_sts(&self.s, &self.w))
    }

    /// Residual variance with denominator n - tr(S).
    pub fn sig2_v1(&self) -> f64 {
        diagnostics::sigma2_v1(self.utu(), self.core.n, self.tr_s())
    }

    /// Residual variance with denominator n - 2·tr(S) + tr(SᵗS).
    pub fn sig2_v1v2(&self) -> Result<f64> {
        diagnostics::sigma2_v1v2(self.utu(), self.core.n, self.tr_s(), self.tr_sts())
    }

    /// Maximum-likelihood residual variance, utu / n.
    pub fn sig2_ml(&self) -> f64 {
        diagnostics::sigma2_ml(self.utu(), self.core.n)
    }

    /// Canonical residual variance, selected by the `sigma2_v1` flag.
    pub fn sig2(&self) -> Result<f64> {
        if self.sigma2_v1 {
            Ok(self.sig2_v1())
        } else {
            self.sig2_v1v2()
        }
    }

    /// Spatially weighted mean of y at each location.
    pub fn y_bar(&self) -> &Col<f64> {
        self.y_bar.get_or_init(|| {
            diagnostics::y_bar(&self.w_matrix, &self.core.y, &self.core.offset)
        })
    }

    /// Spatially weighted total sum of squares at each location.
    pub fn tss(&self) -> &Col<f64> {
        self.tss.get_or_init(|| {
            let tss = diagnostics::tss(&self.w_matrix, &self.core.y, self.y_bar());
            let degenerate = tss.iter().filter(|&&t| t <= 0.0).count();
            if degenerate > 0 {
                log::warn!(
                    "{} locations have non-positive weighted TSS; their local R2 is undefined",
                    degenerate
                );
            }
            tss
        })
    }

    /// Spatially weighted residual sum of squares at each location.
    pub fn rss(&self) -> &Col<f64> {
        self.rss
            .get_or_init(|| diagnostics::rss(&self.w_matrix, &self.u))
    }

    /// Local R², (tss - rss) / tss per location.
    pub fn local_r2(&self) -> &Col<f64> {
        self.local_r2
            .get_or_init(|| diagnostics::local_r2(self.tss(), self.rss()))
    }

    /// Self-leverage S[i,i] of each location.
    pub fn influence(&self) -> &Col<f64> {
        self.influence.get_or_init(|| {
            let influence = diagnostics::influence(&self.s);
            let outside = influence
                .iter()
                .filter(|&&h| !(0.0..=1.0).contains(&h))
                .count();
            if outside > 0 {
                log::warn!("{} leverage values fall outside [0, 1]", outside);
            }
            influence
        })
    }

    /// Leverage-adjusted standardized residuals.
    pub fn std_res(&self) -> Result<&Col<f64>> {
        if let Some(std_res) = self.std_res.get() {
            return Ok(std_res);
        }
        let sig2 = self.sig2()?;
        let std_res = diagnostics::standardized_residuals(&self.u, self.influence(), sig2);
        Ok(self.std_res.get_or_init(|| std_res))
    }

    /// Cook's distance of each observation.
    pub fn cooks_d(&self) -> Result<&Col<f64>> {
        if let Some(cooks_d) = self.cooks_d.get() {
            return Ok(cooks_d);
        }
        let cooks_d = diagnostics::cooks_d(self.std_res()?, self.influence(), self.tr_s());
        Ok(self.cooks_d.get_or_init(|| cooks_d))
    }

    /// Standard errors of the local coefficients, n×k.
    pub fn bse(&self) -> Result<&Mat<f64>> {
        if let Some(bse) = self.bse.get() {
            return Ok(bse);
        }
        // Poisson and Binomial fits carry their variance scale in CCT
        // already; only dispersion-estimating families need sigma2.
        let sig2 = if self.core.family.estimates_dispersion() {
            self.sig2()?
        } else {
            f64::NAN
        };
        let bse = diagnostics::bse(&self.cct, self.core.family, sig2);
        Ok(self.bse.get_or_init(|| bse))
    }

    /// Local t statistics, params elementwise divided by bse.
    pub fn t_values(&self) -> Result<&Mat<f64>> {
        if let Some(t_values) = self.t_values.get() {
            return Ok(t_values);
        }
        let bse = self.bse()?;
        let t_values = Mat::from_fn(self.core.n, self.core.k, |i, j| {
            self.params[(i, j)] / bse[(i, j)]
        });
        Ok(self.t_values.get_or_init(|| t_values))
    }

    /// Local share of deviance explained; NaN for Gaussian fits.
    pub fn p_dev(&self) -> &Col<f64> {
        self.p_dev.get_or_init(|| {
            diagnostics::p_dev(
                self.core.family,
                &self.w_matrix,
                &self.core.y,
                &self.predy,
                self.y_bar(),
            )
        })
    }

    /// Significance levels corrected for multiple testing, for the nominal
    /// 90%, 95%, and 99% confidence levels.
    pub fn adj_alpha(&self) -> Result<[f64; 3]> {
        if let Some(alphas) = self.adj_alpha.get() {
            return Ok(*alphas);
        }
        let alphas =
            inference::adj_alpha(self.core.k, self.tr_s(), self.tr_sts(), self.core.n)?;
        Ok(*self.adj_alpha.get_or_init(|| alphas))
    }

    /// Two-sided critical t value at the given significance level, or at the
    /// corrected 95% level when none is supplied.
    pub fn critical_tval(&self, alpha: Option<f64>) -> Result<f64> {
        let alpha = match alpha {
            Some(alpha) => alpha,
            None => self.adj_alpha()?[1],
        };
        Ok(inference::critical_tval(alpha, self.core.n))
    }

    /// Local t statistics with insignificant entries zeroed. The threshold
    /// defaults to the corrected 95% critical value.
    pub fn filter_tvals(&self, critical: Option<f64>) -> Result<Mat<f64>> {
        let critical = match critical {
            Some(critical) => critical,
            None => self.critical_tval(None)?,
        };
        Ok(inference::filter_tvals(self.t_values()?, critical))
    }
}

#[cfg(test)]
mod tests {
    use crate::core::GwrOptions;
    use crate::kernel::{Bandwidth, KernelType};
    use crate::model::GwrModel;
    use faer::{Col, Mat};

    use super::GwrResults;

    fn grid_coords(side: usize) -> Mat<f64> {
        Mat::from_fn(side * side, 2, |i, j| {
            if j == 0 {
                (i % side) as f64
            } else {
                (i / side) as f64
            }
        })
    }

    fn noisy_results(side: usize) -> GwrResults {
        let coords = grid_coords(side);
        let n = coords.nrows();
        let x = Mat::from_fn(n, 1, |i, _| coords[(i, 0)]);
        // Deterministic low-amplitude noise keeps residuals non-zero.
        let y = Col::from_fn(n, |i| 2.0 + 0.7 * x[(i, 0)] + 0.05 * (i as f64 * 12.9898).sin());
        let options = GwrOptions::builder(Bandwidth::Adaptive(n))
            .kernel(KernelType::Gaussian)
            .build()
            .unwrap();
        GwrModel::new(coords, y, x, options).unwrap().fit().unwrap()
    }

    #[test]
    fn test_tr_s_matches_weighted_diagonal_sum() {
        let results = noisy_results(4);
        let manual: f64 = (0..16).map(|i| results.s[(i, i)] * results.w[i]).sum();
        assert!((results.tr_s() - manual).abs() < 1e-12);
    }

    #[test]
    fn test_cached_traces_are_idempotent() {
        let results = noisy_results(4);
        assert_eq!(results.tr_s(), results.tr_s());
        assert_eq!(results.tr_sts(), results.tr_sts());
        assert_eq!(results.utu(), results.utu());
    }

    #[test]
    fn test_sig2_defaults_to_v1v2() {
        let results = noisy_results(4);
        let sig2 = results.sig2().unwrap();
        assert!((sig2 - results.sig2_v1v2().unwrap()).abs() < 1e-14);
        assert!(sig2 > 0.0);
        assert!(results.sig2_v1() > 0.0);
        assert!(results.sig2_ml() > 0.0);
    }

    #[test]
    fn test_local_r2_bounded_for_noisy_line() {
        let results = noisy_results(4);
        let r2 = results.local_r2();
        for i in 0..16 {
            assert!(r2[i] >= 0.0 && r2[i] <= 1.0, "local R2 out of range: {}", r2[i]);
        }
    }

    #[test]
    fn test_leverage_on_diagonal() {
        let results = noisy_results(4);
        let influence = results.influence();
        for i in 0..16 {
            assert_eq!(influence[i], results.s[(i, i)]);
            assert!(influence[i] > 0.0 && influence[i] <= 1.0);
        }
    }

    #[test]
    fn test_residual_diagnostics_are_finite() {
        let results = noisy_results(4);
        let std_res = results.std_res().unwrap();
        let cooks_d = results.cooks_d().unwrap();
        for i in 0..16 {
            assert!(std_res[i].is_finite());
            assert!(cooks_d[i].is_finite());
            assert!(cooks_d[i] >= 0.0);
        }
    }

    #[test]
    fn test_t_values_are_params_over_bse() {
        let results = noisy_results(4);
        let bse = results.bse().unwrap();
        let t = results.t_values().unwrap();
        for i in 0..16 {
            for j in 0..2 {
                assert!(bse[(i, j)] > 0.0);
                assert!((t[(i, j)] - results.params[(i, j)] / bse[(i, j)]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_p_dev_is_nan_for_gaussian() {
        let results = noisy_results(4);
        for i in 0..16 {
            assert!(results.p_dev()[i].is_nan());
        }
    }

    #[test]
    fn test_adj_alpha_ordering_and_default_critical() {
        let results = noisy_results(4);
        let alphas = results.adj_alpha().unwrap();
        assert!(alphas[0] > alphas[1]);
        assert!(alphas[1] > alphas[2]);

        let default = results.critical_tval(None).unwrap();
        let explicit = results.critical_tval(Some(alphas[1])).unwrap();
        assert_eq!(default, explicit);
    }

    #[test]
    fn test_filter_tvals_zeroes_below_threshold() {
        let results = noisy_results(4);
        let huge = results.filter_tvals(Some(f64::MAX)).unwrap();
        for i in 0..16 {
            for j in 0..2 {
                assert_eq!(huge[(i, j)], 0.0);
            }
        }

        let none = results.filter_tvals(Some(0.0)).unwrap();
        let t = results.t_values().unwrap();
        for i in 0..16 {
            for j in 0..2 {
                assert_eq!(none[(i, j)], t[(i, j)]);
            }
        }
    }

    #[test]
    fn test_y_bar_with_uniform_weights_is_global_mean() {
        // A gaussian kernel with an enormous fixed bandwidth weights every
        // observation almost equally.
        let coords = grid_coords(3);
        let n = coords.nrows();
        let x = Mat::from_fn(n, 1, |i, _| coords[(i, 0)]);
        let y = Col::from_fn(n, |i| 1.0 + 0.5 * x[(i, 0)] + 0.1 * (i as f64).cos());
        let mean = y.iter().sum::<f64>() / n as f64;

        let options = GwrOptions::builder(Bandwidth::Fixed(1e6))
            .kernel(KernelType::Gaussian)
            .build()
            .unwrap();
        let results = GwrModel::new(coords, y, x, options).unwrap().fit().unwrap();

        for i in 0..n {
            assert!((results.y_bar()[i] - mean).abs() < 1e-6);
        }
    }
}
