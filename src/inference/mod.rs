//! Statistical inference (critical values, corrected significance levels).

mod significance;

pub use significance::{adj_alpha, critical_tval, filter_tvals};
