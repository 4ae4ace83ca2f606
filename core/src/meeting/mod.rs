//! Meeting module

mod model;
mod store;

pub use model::*;
pub use store::*;
