//! Canonical link functions for the supported GLM families.
//!
//! Each family maps to exactly one link: identity for Gaussian, log for
//! Poisson, logit for Binomial. The link carries the pieces IRLS needs:
//! g(μ), g⁻¹(η), and the derivative dη/dμ.

/// Link function between the mean μ and the linear predictor η.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// Identity link: g(μ) = μ
    Identity,
    /// Log link: g(μ) = log(μ)
    Log,
    /// Logit link: g(μ) = log(μ/(1-μ))
    Logit,
}

impl Link {
    /// Compute the link function g(μ).
    #[inline]
    pub fn link(&self, mu: f64) -> f64 {
        match self {
            Link::Identity => mu,
            Link::Log => mu.max(1e-10).ln(),
            Link::Logit => {
                let m = mu.clamp(1e-10, 1.0 - 1e-10);
                (m / (1.0 - m)).ln()
            }
        }
    }

    /// Compute the inverse link g⁻¹(η) = μ.
    #[inline]
    pub fn inverse(&self, eta: f64) -> f64 {
        match self {
            Link::Identity => eta,
            Link::Log => {
                // Cap η so exp never overflows; runaway predictors surface
                // through the convergence check instead of as infinities.
                eta.min(700.0).exp()
            }
            Link::Logit => {
                if eta > 30.0 {
                    1.0 - 1e-14
                } else if eta < -30.0 {
                    1e-14
                } else {
                    1.0 / (1.0 + (-eta).exp())
                }
            }
        }
    }

    /// Compute the derivative of the link, dη/dμ.
    #[inline]
    pub fn derivative(&self, mu: f64) -> f64 {
        match self {
            Link::Identity => 1.0,
            Link::Log => 1.0 / mu.max(1e-10),
            Link::Logit => {
                let m = mu.clamp(1e-10, 1.0 - 1e-10);
                1.0 / (m * (1.0 - m))
            }
        }
    }
}
