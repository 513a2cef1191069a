//! Diagnostics over the assembled hat matrix and residuals.
//!
//! Pure functions of the fitted aggregate; the results types memoize them on
//! first access.

mod hat;
mod local_fit;
mod residuals;

pub use hat::{sigma2_ml, sigma2_v1, sigma2_v1v2, trace_s, trace_sts};
pub use local_fit::{local_r2, p_dev, rss, tss, y_bar};
pub use residuals::{bse, cooks_d, influence, standardized_residuals};
