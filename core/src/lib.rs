//! Core library for Vernite
//!
//! This crate contains the domain model and its rules:
//! - Workspaces, projects and memberships
//! - Tasks, statuses, sprints, releases and meetings
//! - Comments, time tracking and calendar events
//! - Vendor-agnostic git types shared with integrations

pub mod comment;
pub mod error;
pub mod event;
pub mod git;
pub mod meeting;
pub mod project;
pub mod release;
pub mod sprint;
pub mod status;
pub mod storage;
pub mod task;
pub mod time_track;
pub mod tracker;
pub mod validation;
pub mod workspace;

pub use error::Error;
pub use tracker::Tracker;
pub type Result<T> = std::result::Result<T, Error>;
