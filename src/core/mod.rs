//! Core model types: families, links, options, and shared observation data.

mod family;
mod link;
mod model;
mod options;

pub use family::Family;
pub use link::Link;
pub use model::ModelCore;
pub use options::{GwrOptions, GwrOptionsBuilder, OptionsError};
