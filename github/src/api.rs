//! GitHub REST payloads and their translation into core git types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vernite_core::git::{Branch, Issue, PullRequest, Repository};

use crate::SERVICE_NAME;

/// Response of the OAuth access token endpoint. GitHub answers `200 OK`
/// with an `error` field when the code or refresh token is rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthToken {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub refresh_token_expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallationList {
    #[serde(default)]
    pub installations: Vec<GitHubInstallation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubInstallation {
    pub id: u64,
    pub app_id: u64,
    #[serde(default)]
    pub target_type: String,
    #[serde(default)]
    pub suspended_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallationToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryList {
    #[serde(default)]
    pub repositories: Vec<GitHubRepository>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub private: bool,
}

impl From<GitHubRepository> for Repository {
    fn from(repo: GitHubRepository) -> Self {
        Self {
            id: repo.id,
            name: repo.name,
            full_name: repo.full_name,
            url: repo.html_url,
            private: repo.private,
            service: SERVICE_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubIssue {
    pub number: u64,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: String,
    /// Present when the issue is really a pull request
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
    #[serde(default)]
    pub assignees: Vec<GitHubUser>,
}

impl GitHubIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

impl From<GitHubIssue> for Issue {
    fn from(issue: GitHubIssue) -> Self {
        Self {
            id: issue.number,
            url: issue.html_url,
            title: issue.title,
            description: issue.body.unwrap_or_default(),
            service: SERVICE_NAME.to_string(),
            state: issue.state,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubPull {
    pub number: u64,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub merged: Option<bool>,
    #[serde(default)]
    pub merged_at: Option<String>,
    pub head: GitRef,
    #[serde(default)]
    pub assignees: Vec<GitHubUser>,
}

impl GitHubPull {
    /// List responses omit `merged`; fall back to `merged_at`
    pub fn is_merged(&self) -> bool {
        self.merged.unwrap_or(self.merged_at.is_some())
    }
}

impl From<GitHubPull> for PullRequest {
    fn from(pull: GitHubPull) -> Self {
        let merged = pull.is_merged();
        Self {
            id: pull.number,
            url: pull.html_url,
            title: pull.title,
            description: pull.body.unwrap_or_default(),
            service: SERVICE_NAME.to_string(),
            state: pull.state,
            branch: Some(pull.head.name),
            merged,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubBranch {
    pub name: String,
}

impl From<GitHubBranch> for Branch {
    fn from(branch: GitHubBranch) -> Self {
        Self { name: branch.name }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppRef {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubComment {
    pub id: u64,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub user: Option<GitHubUser>,
    /// Set when the comment was posted through an app installation token
    #[serde(default)]
    pub performed_via_github_app: Option<AppRef>,
}

impl GitHubComment {
    pub fn posted_by_app(&self, app_id: u64) -> bool {
        self.performed_via_github_app
            .as_ref()
            .is_some_and(|app| app.id == app_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRelease {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MergeResult {
    #[serde(default)]
    pub merged: bool,
}

/// Body of issue and pull request create/edit calls; unset fields are left alone
#[derive(Debug, Clone, Default, Serialize)]
pub struct IssuePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewRelease {
    pub tag_name: String,
    pub name: String,
    pub body: String,
    pub target_commitish: Option<String>,
    pub generate_release_notes: bool,
}

impl NewRelease {
    /// Tags cannot contain spaces, so the release name is dashed
    pub fn new(name: &str, body: &str, branch: Option<String>) -> Self {
        Self {
            tag_name: name.trim().replace(' ', "-"),
            name: name.to_string(),
            body: body.to_string(),
            target_commitish: branch,
            generate_release_notes: true,
        }
    }
}
