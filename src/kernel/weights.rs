//! Kernel functions and spatial weight matrix construction.
//!
//! # Example
//!
//! ```rust,ignore
//! use gwr_rs::kernel::{weight_matrix, Bandwidth, KernelType};
//!
//! let w = weight_matrix(&coords, KernelType::Bisquare, Bandwidth::Adaptive(10))?;
//! assert_eq!(w.nrows(), coords.nrows());
//! ```

use std::fmt;
use std::str::FromStr;

use faer::{Col, Mat};
use rayon::prelude::*;

use crate::core::OptionsError;
use crate::error::GwrError;

/// Adaptive bandwidths are nudged past the pivot distance so the bw-th
/// nearest neighbour itself keeps a small positive weight under truncating
/// kernels.
const ADAPTIVE_SCALE: f64 = 1.000_000_1;

/// Kernel function applied to scaled distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelType {
    /// `exp(-0.5 (d/b)^2)`, positive everywhere.
    Gaussian,
    /// `(1 - (d/b)^2)^2` inside the bandwidth, exactly zero at and beyond it.
    Bisquare,
    /// `exp(-d/b)`, positive everywhere.
    Exponential,
}

impl KernelType {
    /// Weight of an observation at distance `d` from the calibration
    /// location, under bandwidth `b`.
    #[inline]
    pub fn weight(&self, d: f64, b: f64) -> f64 {
        let z = d / b;
        match self {
            KernelType::Gaussian => (-0.5 * z * z).exp(),
            KernelType::Bisquare => {
                if d >= b {
                    0.0
                } else {
                    let u = 1.0 - z * z;
                    u * u
                }
            }
            KernelType::Exponential => (-z).exp(),
        }
    }
}

impl fmt::Display for KernelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelType::Gaussian => write!(f, "gaussian"),
            KernelType::Bisquare => write!(f, "bisquare"),
            KernelType::Exponential => write!(f, "exponential"),
        }
    }
}

impl FromStr for KernelType {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("gaussian") {
            Ok(KernelType::Gaussian)
        } else if s.eq_ignore_ascii_case("bisquare") {
            Ok(KernelType::Bisquare)
        } else if s.eq_ignore_ascii_case("exponential") {
            Ok(KernelType::Exponential)
        } else {
            Err(OptionsError::UnknownKernel(s.to_string()))
        }
    }
}

/// Kernel scale, shared across locations or resolved per location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bandwidth {
    /// One distance shared by every calibration location.
    Fixed(f64),
    /// Per-location bandwidth equal to the distance of the bw-th nearest
    /// observation (1-indexed, the location itself included), scaled by
    /// [`ADAPTIVE_SCALE`].
    Adaptive(usize),
}

impl Bandwidth {
    /// Resolve the kernel scale for one location given its distance row.
    fn scale_for(&self, distances: &Col<f64>) -> f64 {
        match self {
            Bandwidth::Fixed(b) => *b,
            Bandwidth::Adaptive(neighbors) => {
                let mut sorted: Vec<f64> = distances.iter().copied().collect();
                sorted.sort_by(f64::total_cmp);
                sorted[neighbors - 1] * ADAPTIVE_SCALE
            }
        }
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bandwidth::Fixed(b) => write!(f, "fixed({b})"),
            Bandwidth::Adaptive(k) => write!(f, "adaptive({k})"),
        }
    }
}

/// Euclidean distances from calibration location `i` to every observation.
fn distance_row(coords: &Mat<f64>, i: usize) -> Col<f64> {
    Col::from_fn(coords.nrows(), |j| {
        let dx = coords[(i, 0)] - coords[(j, 0)];
        let dy = coords[(i, 1)] - coords[(j, 1)];
        (dx * dx + dy * dy).sqrt()
    })
}

/// Build the dense n×n spatial weight matrix.
///
/// Row i holds the kernel weights of all n observations relative to
/// calibration location i. Every kernel takes its maximum at distance zero,
/// so `w[(i, i)]` is the largest entry of row i.
///
/// Fails when an adaptive bandwidth names more neighbours than there are
/// observations, or when it resolves to zero because the bw-th nearest
/// observation sits at the exact same coordinates as the calibration
/// location; such a row has no usable local support.
pub fn weight_matrix(
    coords: &Mat<f64>,
    kernel: KernelType,
    bandwidth: Bandwidth,
) -> Result<Mat<f64>, GwrError> {
    let n = coords.nrows();
    if let Bandwidth::Adaptive(neighbors) = bandwidth {
        if neighbors > n {
            return Err(OptionsError::NeighborCountExceedsObservations { neighbors, n }.into());
        }
    }
    let rows: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let distances = distance_row(coords, i);
            let scale = bandwidth.scale_for(&distances);
            if !(scale > 0.0) {
                return Err(GwrError::SingularMatrix { location: i });
            }
            Ok((0..n).map(|j| kernel.weight(distances[j], scale)).collect())
        })
        .collect::<Result<_, _>>()?;
    Ok(Mat::from_fn(n, n, |i, j| rows[i][j]))
}
