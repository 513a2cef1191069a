//! Model options and configuration.

use thiserror::Error;

use super::family::Family;
use crate::kernel::{Bandwidth, KernelType};

/// Configuration for a geographically weighted model.
///
/// The bandwidth has no sensible default and is supplied up front; everything
/// else defaults to the common calibration setup (bisquare kernel, Gaussian
/// family, intercept, v1v2 variance estimator).
#[derive(Debug, Clone)]
pub struct GwrOptions {
    /// Kernel scale: a fixed distance or an adaptive neighbor count.
    pub bandwidth: Bandwidth,
    /// Kernel weighting function (default: bisquare).
    pub kernel: KernelType,
    /// Response family (default: Gaussian).
    pub family: Family,
    /// Whether to prepend an intercept column to the design (default: true).
    pub with_intercept: bool,
    /// Select `utu/(n - tr(S))` as the canonical σ² instead of the
    /// `utu/(n - 2·tr(S) + tr(S'S))` estimator (default: false).
    pub sigma2_v1: bool,
    /// IRLS convergence tolerance on max |Δβ| (default: 1e-5).
    pub tolerance: f64,
    /// Hard cap on IRLS iterations per location (default: 20).
    pub max_iterations: usize,
    /// Threshold on |R[i,i]| below which the normal equations are treated
    /// as singular (default: 1e-10).
    pub rank_tolerance: f64,
}

impl GwrOptions {
    /// Create options with the given bandwidth and defaults for the rest.
    pub fn new(bandwidth: Bandwidth) -> Self {
        Self {
            bandwidth,
            kernel: KernelType::Bisquare,
            family: Family::Gaussian,
            with_intercept: true,
            sigma2_v1: false,
            tolerance: 1e-5,
            max_iterations: 20,
            rank_tolerance: 1e-10,
        }
    }

    /// Create a builder seeded with the given bandwidth.
    pub fn builder(bandwidth: Bandwidth) -> GwrOptionsBuilder {
        GwrOptionsBuilder {
            options: Self::new(bandwidth),
        }
    }

    /// Validate the options and return an error if invalid.
    pub fn validate(&self) -> Result<(), OptionsError> {
        match self.bandwidth {
            Bandwidth::Fixed(b) => {
                if !(b > 0.0) {
                    return Err(OptionsError::InvalidBandwidth(b));
                }
            }
            Bandwidth::Adaptive(k) => {
                if k == 0 {
                    return Err(OptionsError::InvalidNeighborCount(k));
                }
            }
        }
        if self.tolerance <= 0.0 {
            return Err(OptionsError::InvalidTolerance(self.tolerance));
        }
        if self.max_iterations < 1 {
            return Err(OptionsError::InvalidMaxIterations(self.max_iterations));
        }
        if self.rank_tolerance <= 0.0 {
            return Err(OptionsError::InvalidTolerance(self.rank_tolerance));
        }
        Ok(())
    }
}

/// Errors that can occur when validating model options.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("fixed bandwidth must be a positive distance, got {0}")]
    InvalidBandwidth(f64),
    #[error("adaptive bandwidth must name at least one neighbor, got {0}")]
    InvalidNeighborCount(usize),
    #[error("adaptive bandwidth of {neighbors} neighbors exceeds the {n} observations")]
    NeighborCountExceedsObservations { neighbors: usize, n: usize },
    #[error("tolerance must be positive, got {0}")]
    InvalidTolerance(f64),
    #[error("max_iterations must be at least 1, got {0}")]
    InvalidMaxIterations(usize),
    #[error("unknown kernel function `{0}`")]
    UnknownKernel(String),
    #[error("unknown family `{0}`")]
    UnknownFamily(String),
    #[error("an offset is only supported for the poisson family")]
    OffsetRequiresPoisson,
}

/// Builder for `GwrOptions`.
#[derive(Debug, Clone)]
pub struct GwrOptionsBuilder {
    options: GwrOptions,
}

impl GwrOptionsBuilder {
    /// Set the kernel weighting function.
    pub fn kernel(mut self, kernel: KernelType) -> Self {
        self.options.kernel = kernel;
        self
    }

    /// Set the response family.
    pub fn family(mut self, family: Family) -> Self {
        self.options.family = family;
        self
    }

    /// Set whether to prepend an intercept column.
    pub fn with_intercept(mut self, include: bool) -> Self {
        self.options.with_intercept = include;
        self
    }

    /// Select the `utu/(n - tr(S))` variance estimator.
    pub fn sigma2_v1(mut self, v1: bool) -> Self {
        self.options.sigma2_v1 = v1;
        self
    }

    /// Set the IRLS convergence tolerance.
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.options.tolerance = tol;
        self
    }

    /// Set the IRLS iteration cap.
    pub fn max_iterations(mut self, max_iter: usize) -> Self {
        self.options.max_iterations = max_iter;
        self
    }

    /// Set the singularity threshold for the QR diagonal.
    pub fn rank_tolerance(mut self, tol: f64) -> Self {
        self.options.rank_tolerance = tol;
        self
    }

    /// Build and validate the options.
    pub fn build(self) -> Result<GwrOptions, OptionsError> {
        self.options.validate()?;
        Ok(self.options)
    }

    /// Build the options without validation.
    pub fn build_unchecked(self) -> GwrOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = GwrOptions::new(Bandwidth::Adaptive(10));
        assert_eq!(opts.kernel, KernelType::Bisquare);
        assert_eq!(opts.family, Family::Gaussian);
        assert!(opts.with_intercept);
        assert!(!opts.sigma2_v1);
        assert!((opts.tolerance - 1e-5).abs() < 1e-15);
        assert_eq!(opts.max_iterations, 20);
    }

    #[test]
    fn test_builder() {
        let opts = GwrOptions::builder(Bandwidth::Fixed(2.5))
            .kernel(KernelType::Gaussian)
            .family(Family::Poisson)
            .sigma2_v1(true)
            .max_iterations(50)
            .build()
            .unwrap();

        assert_eq!(opts.kernel, KernelType::Gaussian);
        assert_eq!(opts.family, Family::Poisson);
        assert!(opts.sigma2_v1);
        assert_eq!(opts.max_iterations, 50);
    }

    #[test]
    fn test_validation_nonpositive_fixed_bandwidth() {
        let result = GwrOptions::builder(Bandwidth::Fixed(0.0)).build();
        assert!(matches!(result, Err(OptionsError::InvalidBandwidth(_))));

        let result = GwrOptions::builder(Bandwidth::Fixed(-3.0)).build();
        assert!(matches!(result, Err(OptionsError::InvalidBandwidth(_))));
    }

    #[test]
    fn test_validation_nan_bandwidth() {
        let result = GwrOptions::builder(Bandwidth::Fixed(f64::NAN)).build();
        assert!(matches!(result, Err(OptionsError::InvalidBandwidth(_))));
    }

    #[test]
    fn test_validation_zero_neighbors() {
        let result = GwrOptions::builder(Bandwidth::Adaptive(0)).build();
        assert!(matches!(result, Err(OptionsError::InvalidNeighborCount(0))));
    }

    #[test]
    fn test_validation_invalid_tolerance() {
        let result = GwrOptions::builder(Bandwidth::Adaptive(5))
            .tolerance(0.0)
            .build();
        assert!(matches!(result, Err(OptionsError::InvalidTolerance(_))));
    }

    #[test]
    fn test_validation_invalid_max_iterations() {
        let result = GwrOptions::builder(Bandwidth::Adaptive(5))
            .max_iterations(0)
            .build();
        assert!(matches!(result, Err(OptionsError::InvalidMaxIterations(0))));
    }
}
