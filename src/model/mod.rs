//! Geographically weighted models and their fitted results.

mod gwr;
mod results;

pub use gwr::GwrModel;
pub use results::GwrResults;
