//! GitHub App settings read from the environment

use std::path::PathBuf;

use crate::error::GitHubError;
use crate::{Result, DEFAULT_API_URL, DEFAULT_OAUTH_URL};

#[derive(Clone)]
pub struct GitHubConfig {
    pub app_id: u64,
    pub client_id: String,
    pub client_secret: String,
    /// RSA private key of the app in PEM form
    pub private_key_pem: Vec<u8>,
    pub webhook_secret: String,
    pub api_url: String,
    pub oauth_url: String,
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("app_id", &self.app_id)
            .field("client_id", &self.client_id)
            .field("api_url", &self.api_url)
            .field("oauth_url", &self.oauth_url)
            .finish_non_exhaustive()
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl GitHubConfig {
    /// Load the app settings. Returns `Ok(None)` when any required variable
    /// is missing, which disables the integration.
    pub fn from_env() -> Result<Option<Self>> {
        let (Some(app_id), Some(client_id), Some(client_secret), Some(key_path), Some(webhook_secret)) = (
            env_string("VERNITE_GITHUB_APP_ID"),
            env_string("VERNITE_GITHUB_CLIENT_ID"),
            env_string("VERNITE_GITHUB_CLIENT_SECRET"),
            env_string("VERNITE_GITHUB_PRIVATE_KEY_PATH"),
            env_string("VERNITE_GITHUB_WEBHOOK_SECRET"),
        ) else {
            return Ok(None);
        };

        let app_id = app_id.parse::<u64>().map_err(|_| {
            GitHubError::NotConfigured(format!("VERNITE_GITHUB_APP_ID is not a number: {}", app_id))
        })?;
        let key_path = PathBuf::from(key_path);
        let private_key_pem = std::fs::read(&key_path).map_err(|e| {
            GitHubError::NotConfigured(format!(
                "failed to read private key {}: {}",
                key_path.display(),
                e
            ))
        })?;

        Ok(Some(Self {
            app_id,
            client_id,
            client_secret,
            private_key_pem,
            webhook_secret,
            api_url: env_string("VERNITE_GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            oauth_url: env_string("VERNITE_GITHUB_OAUTH_URL")
                .unwrap_or_else(|| DEFAULT_OAUTH_URL.to_string()),
        }))
    }
}
