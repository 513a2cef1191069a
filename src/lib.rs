//! Geographically weighted regression.
//!
//! This library calibrates one locally weighted generalized linear model per
//! location, using spatial kernels to down-weight distant observations, and
//! derives hat-matrix diagnostics (effective parameters, corrected variance
//! estimators, leverage, local fit, significance corrections) from the
//! assembled fits. A global GLM estimator fitted by the same IRLS routine is
//! included as the aspatial baseline.
//!
//! # Example
//!
//! ```rust,ignore
//! use gwr_rs::prelude::*;
//!
//! // Calibrate a Poisson GWR with an adaptive bisquare kernel.
//! let options = GwrOptions::builder(Bandwidth::Adaptive(40))
//!     .kernel(KernelType::Bisquare)
//!     .family(Family::Poisson)
//!     .build()?;
//! let results = GwrModel::new(coords, y, x, options)?.fit()?;
//!
//! // Per-location coefficients and diagnostics.
//! println!("effective parameters = {:.2}", results.tr_s());
//! println!("local R2 at 0 = {:.3}", results.local_r2()[0]);
//! let significant = results.filter_tvals(None)?;
//! ```

pub mod core;
pub mod diagnostics;
pub mod error;
pub mod inference;
pub mod kernel;
pub mod model;
pub mod solvers;
pub mod utils;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{Family, GwrOptions, GwrOptionsBuilder, Link, ModelCore};
    pub use crate::error::{GwrError, Result};
    pub use crate::kernel::{Bandwidth, KernelType};
    pub use crate::model::{GwrModel, GwrResults};
    pub use crate::solvers::{GlmModel, GlmResults};
}

pub use crate::core::{Family, GwrOptions, GwrOptionsBuilder};
pub use crate::error::{GwrError, Result};
pub use crate::kernel::{Bandwidth, KernelType};
pub use crate::model::{GwrModel, GwrResults};
pub use crate::solvers::{GlmModel, GlmResults};
