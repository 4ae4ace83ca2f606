//! Workspace module
//!
//! A Workspace is a per-user folder of projects. Workspace ids are numbered
//! per user; id 0 is the inbox that receives project invitations.

mod model;
mod store;

pub use model::*;
pub use store::*;
