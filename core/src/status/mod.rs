//! Status module
//!
//! Statuses are the ordered board columns of a project.

mod model;
mod store;

pub use model::*;
pub use store::*;
