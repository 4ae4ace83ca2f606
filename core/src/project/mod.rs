//! Project module
//!
//! A Project groups statuses, tasks, sprints, releases and meetings. Users
//! reach a project through a membership that files it in one of their
//! workspaces.

mod model;
mod store;

pub use model::*;
pub use store::*;
