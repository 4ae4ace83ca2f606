//! GitHub App integration
//!
//! Links projects to repositories through app installations, mirrors tasks
//! to issues and pull requests, and applies webhook deliveries back onto
//! the tracker.

pub mod api;
pub mod app_jwt;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod service;
pub mod store;
pub mod webhook;

pub use client::GitHubClient;
pub use config::GitHubConfig;
pub use error::GitHubError;
pub use service::GitHubService;

pub type Result<T> = std::result::Result<T, GitHubError>;

/// Service name reported on vendor-agnostic git records
pub const SERVICE_NAME: &str = "github";
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_OAUTH_URL: &str = "https://github.com";
