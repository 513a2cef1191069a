//! Spatial kernel weighting.
//!
//! Maps coordinates, a kernel function, and a bandwidth to the dense n×n
//! weight matrix that drives every local fit: row i holds the kernel weights
//! of all observations relative to calibration location i.

mod weights;

pub use weights::{weight_matrix, Bandwidth, KernelType};
