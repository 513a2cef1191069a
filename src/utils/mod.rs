//! Shared numeric utilities.

mod matrix;

pub use matrix::{qr_inverse, weighted_gram, weighted_transpose};
