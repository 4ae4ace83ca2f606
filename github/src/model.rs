//! Persisted integration records

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vernite_core::storage::Entity;
use vernite_core::Error;

use crate::api::{GitHubInstallation, GitHubUser, InstallationToken, OAuthToken};

/// A GitHub account linked to a Vernite user through OAuth
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    /// GitHub user id
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
    pub access_token: String,
    /// `None` for tokens that never expire
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub refresh_token_expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    pub user_id: Uuid,
}

impl Authorization {
    pub fn new(user_id: Uuid, account: &GitHubUser, token: &OAuthToken) -> Self {
        let mut authorization = Self {
            id: account.id,
            login: account.login.clone(),
            avatar_url: account.avatar_url.clone(),
            access_token: String::new(),
            expires: None,
            refresh_token: None,
            refresh_token_expires: None,
            token_type: String::new(),
            scope: String::new(),
            user_id,
        };
        authorization.refresh(token);
        authorization
    }

    /// Store a freshly issued token pair
    pub fn refresh(&mut self, token: &OAuthToken) {
        let now = Utc::now();
        self.access_token = token.access_token.clone();
        self.expires = token.expires_in.map(|s| now + Duration::seconds(s));
        if token.refresh_token.is_some() {
            self.refresh_token = token.refresh_token.clone();
        }
        self.refresh_token_expires = token
            .refresh_token_expires_in
            .map(|s| now + Duration::seconds(s));
        self.token_type = token.token_type.clone();
        self.scope = token.scope.clone();
    }

    pub fn should_refresh_token(&self) -> bool {
        self.expires.is_some_and(|expires| Utc::now() >= expires)
    }
}

impl Entity for Authorization {
    type Key = u64;
    const NAME: &'static str = "GitHub authorization";

    fn key(&self) -> u64 {
        self.id
    }
}

/// What the API shows of an [`Authorization`]; tokens stay server side
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubAccount {
    pub id: u64,
    pub login: String,
    pub avatar_url: String,
}

impl From<&Authorization> for GitHubAccount {
    fn from(authorization: &Authorization) -> Self {
        Self {
            id: authorization.id,
            login: authorization.login.clone(),
            avatar_url: authorization.avatar_url.clone(),
        }
    }
}

/// An installation of the GitHub App on an account or organization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    pub id: u64,
    #[serde(default)]
    pub token: String,
    pub expires: DateTime<Utc>,
    #[serde(default)]
    pub target_type: String,
    #[serde(default)]
    pub suspended: bool,
}

impl Installation {
    /// New installations have no token yet, so they start expired
    pub fn new(installation: &GitHubInstallation) -> Self {
        Self {
            id: installation.id,
            token: String::new(),
            expires: DateTime::<Utc>::default(),
            target_type: installation.target_type.clone(),
            suspended: installation.suspended_at.is_some(),
        }
    }

    pub fn update(&mut self, installation: &GitHubInstallation) {
        self.target_type = installation.target_type.clone();
        self.suspended = installation.suspended_at.is_some();
    }

    pub fn refresh(&mut self, token: InstallationToken) {
        self.token = token.token;
        self.expires = token.expires_at;
    }

    pub fn should_refresh_token(&self) -> bool {
        Utc::now() >= self.expires
    }
}

impl Entity for Installation {
    type Key = u64;
    const NAME: &'static str = "GitHub installation";

    fn key(&self) -> u64 {
        self.id
    }
}

/// Link between a project and one repository
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectIntegration {
    pub id: Uuid,
    pub project_id: Uuid,
    pub repository_owner: String,
    pub repository_name: String,
    pub installation_id: u64,
    pub created_at: DateTime<Utc>,
}

impl ProjectIntegration {
    /// Build from an `owner/name` repository name
    pub fn new(
        project_id: Uuid,
        full_name: &str,
        installation_id: u64,
    ) -> vernite_core::Result<Self> {
        let (owner, name) = split_full_name(full_name)?;
        Ok(Self {
            id: Uuid::new_v4(),
            project_id,
            repository_owner: owner.to_string(),
            repository_name: name.to_string(),
            installation_id,
            created_at: Utc::now(),
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.repository_owner, self.repository_name)
    }

    pub fn is_repository(&self, full_name: &str) -> bool {
        self.full_name().eq_ignore_ascii_case(full_name)
    }
}

impl Entity for ProjectIntegration {
    type Key = Uuid;
    const NAME: &'static str = "GitHub integration";

    fn key(&self) -> Uuid {
        self.id
    }
}

pub fn split_full_name(full_name: &str) -> vernite_core::Result<(&str, &str)> {
    match full_name.trim().split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(Error::InvalidInput(format!(
            "repository name '{}' is not in owner/name form",
            full_name
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationKind {
    Issue,
    PullRequest,
}

impl IntegrationKind {
    fn path(self) -> &'static str {
        match self {
            Self::Issue => "issues",
            Self::PullRequest => "pull",
        }
    }
}

/// Link between a task and an issue or pull request. A task has at most one
/// of each kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskIntegration {
    pub task_id: Uuid,
    pub integration_id: Uuid,
    pub kind: IntegrationKind,
    /// Issue or pull request number in the repository
    pub issue_id: u64,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub branch: Option<String>,
}

impl TaskIntegration {
    pub fn new(task_id: Uuid, integration_id: Uuid, kind: IntegrationKind, issue_id: u64) -> Self {
        Self {
            task_id,
            integration_id,
            kind,
            issue_id,
            merged: false,
            branch: None,
        }
    }

    pub fn link(&self, project: &ProjectIntegration) -> String {
        format!(
            "https://github.com/{}/{}/{}/{}",
            project.repository_owner,
            project.repository_name,
            self.kind.path(),
            self.issue_id
        )
    }
}

impl Entity for TaskIntegration {
    type Key = (Uuid, IntegrationKind);
    const NAME: &'static str = "Task integration";

    fn key(&self) -> Self::Key {
        (self.task_id, self.kind)
    }
}

/// Link between a task comment and its GitHub issue comment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentIntegration {
    pub github_comment_id: u64,
    pub comment_id: Uuid,
    pub integration_id: Uuid,
}

impl Entity for CommentIntegration {
    type Key = u64;
    const NAME: &'static str = "Comment integration";

    fn key(&self) -> u64 {
        self.github_comment_id
    }
}

/// Links of a task as shown next to it in the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull: Option<String>,
    #[serde(default)]
    pub merged: bool,
}
