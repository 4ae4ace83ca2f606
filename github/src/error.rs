//! Error types for the GitHub integration

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("GitHub API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid webhook signature")]
    Signature,

    #[error("Invalid payload: {0}")]
    Payload(String),

    #[error("GitHub integration is not configured: {0}")]
    NotConfigured(String),

    #[error("No installation has access to repository {0}")]
    NoRepositoryAccess(String),

    #[error(transparent)]
    Core(#[from] vernite_core::Error),
}

impl From<reqwest::Error> for GitHubError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}
