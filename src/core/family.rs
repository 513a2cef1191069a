//! Model families for local and global GLM fits.
//!
//! The family is a closed set: Gaussian, Poisson, Binomial. Each tag carries
//! its canonical link plus the variance, deviance, and initialization
//! functions IRLS and the diagnostics engine consume. Branching on the family
//! is always an exhaustive `match` on this enum.
//!
//! # Example
//!
//! ```ignore
//! use gwr_rs::core::Family;
//!
//! let family: Family = "poisson".parse()?;
//! assert_eq!(family.irls_weight(4.0), 4.0); // V(μ)=μ, log link
//! ```

use std::fmt;
use std::str::FromStr;

use faer::Col;

use super::link::Link;
use super::options::OptionsError;
use crate::error::GwrError;

/// Distribution family of the response, with its canonical link.
///
/// # Variance functions
///
/// | family   | V(μ)     | link     |
/// |----------|----------|----------|
/// | Gaussian | 1        | identity |
/// | Poisson  | μ        | log      |
/// | Binomial | μ(1-μ)   | logit    |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Continuous response, identity link.
    Gaussian,
    /// Count response, log link.
    Poisson,
    /// Binary (0/1) response, logit link.
    Binomial,
}

impl Family {
    /// The canonical link for this family.
    #[inline]
    pub fn link(&self) -> Link {
        match self {
            Family::Gaussian => Link::Identity,
            Family::Poisson => Link::Log,
            Family::Binomial => Link::Logit,
        }
    }

    /// Variance function V(μ).
    #[inline]
    pub fn variance(&self, mu: f64) -> f64 {
        match self {
            Family::Gaussian => 1.0,
            Family::Poisson => mu.max(1e-10),
            Family::Binomial => {
                let m = mu.clamp(1e-10, 1.0 - 1e-10);
                m * (1.0 - m)
            }
        }
    }

    /// IRLS weight 1 / (V(μ) · (dη/dμ)²).
    ///
    /// With the canonical link this simplifies to 1 for Gaussian, μ for
    /// Poisson, and μ(1-μ) for Binomial.
    #[inline]
    pub fn irls_weight(&self, mu: f64) -> f64 {
        let v = self.variance(mu);
        let d = self.link().derivative(mu);
        if v.abs() < 1e-14 || d.abs() < 1e-14 {
            return 1e-10;
        }
        1.0 / (v * d * d)
    }

    /// Unit deviance d(y, μ) of a single observation.
    ///
    /// Gaussian: (y-μ)². Poisson: 2[y·log(y/μ) - (y-μ)], with d(0, μ) = 2μ.
    /// Binomial: 2[y·log(y/μ) + (1-y)·log((1-y)/(1-μ))], with limit values
    /// at y = 0 and y = 1.
    pub fn unit_deviance(&self, y: f64, mu: f64) -> f64 {
        match self {
            Family::Gaussian => (y - mu) * (y - mu),
            Family::Poisson => {
                let m = mu.max(1e-10);
                if y < 1e-10 {
                    2.0 * m
                } else {
                    2.0 * (y * (y / m).ln() - (y - m))
                }
            }
            Family::Binomial => {
                let m = mu.clamp(1e-10, 1.0 - 1e-10);
                let term1 = if y > 1e-10 { y * (y / m).ln() } else { 0.0 };
                let term2 = if y < 1.0 - 1e-10 {
                    (1.0 - y) * ((1.0 - y) / (1.0 - m)).ln()
                } else {
                    0.0
                };
                (2.0 * (term1 + term2)).max(0.0)
            }
        }
    }

    /// Total deviance Σ d(yᵢ, μᵢ).
    pub fn deviance(&self, y: &Col<f64>, mu: &Col<f64>) -> f64 {
        (0..y.nrows())
            .map(|i| self.unit_deviance(y[i], mu[i]))
            .sum()
    }

    /// Starting values of μ for IRLS.
    ///
    /// Gaussian starts at y itself; Poisson pushes toward the mean to stay
    /// positive; Binomial pulls toward 1/2 to stay inside (0, 1).
    pub fn initialize_mu(&self, y: &Col<f64>) -> Col<f64> {
        let n = y.nrows();
        match self {
            Family::Gaussian => y.to_owned(),
            Family::Poisson => {
                let y_mean = (y.iter().sum::<f64>() / n as f64).max(1e-3);
                Col::from_fn(n, |i| ((y[i] + y_mean) / 2.0).max(1e-3))
            }
            Family::Binomial => Col::from_fn(n, |i| (y[i] + 0.5) / 2.0),
        }
    }

    /// Whether the dispersion is a free parameter estimated from residuals.
    ///
    /// True only for Gaussian; Poisson and Binomial carry their variance in
    /// V(μ), so coefficient variances are used on the natural scale without
    /// a σ² factor.
    #[inline]
    pub fn estimates_dispersion(&self) -> bool {
        matches!(self, Family::Gaussian)
    }

    /// Check that every response value lies in the family's domain.
    pub fn validate_response(&self, y: &Col<f64>) -> Result<(), GwrError> {
        match self {
            Family::Gaussian => Ok(()),
            Family::Poisson => {
                for i in 0..y.nrows() {
                    if y[i] < 0.0 {
                        return Err(GwrError::InvalidResponse {
                            family: *self,
                            detail: "counts must be non-negative",
                        });
                    }
                }
                Ok(())
            }
            Family::Binomial => {
                for i in 0..y.nrows() {
                    if !(0.0..=1.0).contains(&y[i]) {
                        return Err(GwrError::InvalidResponse {
                            family: *self,
                            detail: "responses must lie in [0, 1]",
                        });
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Family::Gaussian => "gaussian",
            Family::Poisson => "poisson",
            Family::Binomial => "binomial",
        };
        f.write_str(name)
    }
}

impl FromStr for Family {
    type Err = OptionsError;

    /// Parse a family name; "logistic" is accepted as an alias for Binomial.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gaussian" => Ok(Family::Gaussian),
            "poisson" => Ok(Family::Poisson),
            "binomial" | "logistic" => Ok(Family::Binomial),
            _ => Err(OptionsError::UnknownFamily(s.to_string())),
        }
    }
}
