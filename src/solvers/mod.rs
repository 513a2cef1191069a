//! Weighted estimation routines.

mod glm;
mod iwls;

pub use glm::{GlmModel, GlmResults};
pub use iwls::{iwls, IwlsError, IwlsFit};
