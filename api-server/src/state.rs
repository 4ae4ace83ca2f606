//! Application state

use std::path::{Path, PathBuf};
use std::sync::Arc;

use vernite_core::Tracker;
use vernite_github::{GitHubConfig, GitHubService};

use crate::auth::AuthStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    data_dir: PathBuf,
    tracker: Arc<Tracker>,
    auth: AuthStore,
    github: Option<Arc<GitHubService>>,
}

impl AppState {
    /// Open every store under `data_dir`; GitHub stays disabled without a config
    pub async fn new(data_dir: PathBuf, github: Option<GitHubConfig>) -> anyhow::Result<Self> {
        let tracker = Arc::new(Tracker::open(&data_dir).await?);
        let auth = AuthStore::new(data_dir.join("auth")).await?;
        let github = match github {
            Some(config) => Some(Arc::new(
                GitHubService::new(&config, Arc::clone(&tracker)).await?,
            )),
            None => None,
        };

        Ok(Self {
            inner: Arc::new(AppStateInner {
                data_dir,
                tracker,
                auth,
                github,
            }),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.inner.data_dir
    }

    pub fn tracker(&self) -> &Tracker {
        &self.inner.tracker
    }

    pub fn auth_store(&self) -> &AuthStore {
        &self.inner.auth
    }

    pub fn github(&self) -> Option<&GitHubService> {
        self.inner.github.as_deref()
    }
}
