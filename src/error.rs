//! Crate-wide error types.

use thiserror::Error;

use crate::core::{Family, OptionsError};
use crate::solvers::IwlsError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GwrError>;

/// Errors produced while configuring, calibrating, or diagnosing a model.
///
/// Configuration problems (`DimensionMismatch`, `InvalidOptions`,
/// `InvalidResponse`) are raised at construction, before any weighted solve
/// runs. The remaining variants come out of `fit()` or a diagnostic accessor;
/// per-location failures carry the calibration location that produced them.
#[derive(Debug, Error)]
pub enum GwrError {
    /// An input array has the wrong length or shape.
    #[error("dimension mismatch: {name} has {got} rows, expected {expected}")]
    DimensionMismatch {
        name: &'static str,
        got: usize,
        expected: usize,
    },

    /// Model options rejected during validation.
    #[error("invalid options: {0}")]
    InvalidOptions(#[from] OptionsError),

    /// Response values fall outside the family's domain.
    #[error("invalid response for the {family} family: {detail}")]
    InvalidResponse { family: Family, detail: &'static str },

    /// Weighted normal equations not invertible at a calibration location.
    ///
    /// Typically the bandwidth is too small to give the location enough
    /// effective neighbors, or coordinates are duplicated.
    #[error("singular weighted design matrix at calibration location {location}")]
    SingularMatrix { location: usize },

    /// IRLS exceeded the iteration cap before reaching tolerance.
    #[error(
        "IRLS did not converge after {iterations} iterations at calibration location {location}"
    )]
    ConvergenceFailed { iterations: usize, location: usize },

    /// A non-finite value surfaced in a per-location output.
    #[error("non-finite {what} at calibration location {location}, column {column}")]
    NonFinite {
        what: &'static str,
        location: usize,
        column: usize,
    },

    /// An effective-degrees-of-freedom denominator came out non-positive.
    ///
    /// Happens when the hat matrix absorbs (nearly) every observation:
    /// `n - 2·tr(S) + tr(S'S)` or `2·tr(S) - tr(S'S)` is no longer positive
    /// and the requested variance or critical value is undefined.
    #[error("effective degrees of freedom {value} is not positive (n = {n})")]
    DegenerateDegreesOfFreedom { value: f64, n: usize },

    /// A global (non-spatial) GLM fit failed.
    #[error("global GLM fit failed: {0}")]
    Glm(#[from] IwlsError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singular_names_location() {
        let err = GwrError::SingularMatrix { location: 7 };
        assert!(err.to_string().contains("location 7"));
    }

    #[test]
    fn test_options_error_converts() {
        let err: GwrError = OptionsError::InvalidBandwidth(-1.0).into();
        assert!(matches!(err, GwrError::InvalidOptions(_)));
    }

    #[test]
    fn test_glm_error_converts() {
        let err: GwrError = IwlsError::NotConverged { iterations: 50 }.into();
        assert!(err.to_string().contains("50 iterations"));
    }
}
