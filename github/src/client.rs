//! GitHub REST API client
//!
//! Stateless with respect to credentials: every call takes the token it
//! should authenticate with, since user, installation and app tokens are
//! all used against the same API.

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::api::{
    GitHubBranch, GitHubComment, GitHubInstallation, GitHubIssue, GitHubPull, GitHubRelease,
    GitHubRepository, GitHubUser, InstallationList, InstallationToken, IssuePatch, MergeResult,
    NewRelease, OAuthToken, RepositoryList,
};
use crate::error::GitHubError;
use crate::{Result, DEFAULT_API_URL, DEFAULT_OAUTH_URL};

const USER_AGENT: &str = "vernite";
const API_VERSION: &str = "2022-11-28";
const PER_PAGE: &str = "100";

#[derive(Clone)]
pub struct GitHubClient {
    api_url: String,
    oauth_url: String,
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

impl GitHubClient {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self> {
        Self::with_base_urls(DEFAULT_API_URL, DEFAULT_OAUTH_URL, client_id, client_secret)
    }

    /// Create a client against custom API and OAuth hosts (GitHub Enterprise, tests).
    pub fn with_base_urls(
        api_url: impl Into<String>,
        oauth_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GitHubError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            oauth_url: oauth_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            http,
        })
    }

    pub fn oauth_url(&self) -> &str {
        &self.oauth_url
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn request(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_url, path))
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!(
                status = status_code,
                message = message,
                "GitHub API error response"
            );
            return Err(GitHubError::Api {
                status: status_code,
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| GitHubError::Payload(format!("Failed to parse response: {}", e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T> {
        let response = self
            .request(Method::GET, path, token)
            .query(&[("per_page", PER_PAGE)])
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn send<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.request(method, path, token).json(body).send().await?;
        self.handle_response(response).await
    }

    async fn oauth_token(&self, body: serde_json::Value) -> Result<OAuthToken> {
        let response = self
            .http
            .post(format!("{}/login/oauth/access_token", self.oauth_url))
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;
        let token: OAuthToken = self.handle_response(response).await?;

        if let Some(error) = token.error {
            let message = token.error_description.unwrap_or(error);
            warn!(message = %message, "GitHub OAuth token request rejected");
            return Err(GitHubError::Api {
                status: 401,
                message,
            });
        }
        Ok(token)
    }

    /// Exchange an OAuth callback code for a user token
    pub async fn exchange_code(&self, code: &str) -> Result<OAuthToken> {
        debug!("exchanging GitHub OAuth code");
        self.oauth_token(json!({
            "client_id": self.client_id,
            "client_secret": self.client_secret,
            "code": code,
        }))
        .await
    }

    pub async fn refresh_user_token(&self, refresh_token: &str) -> Result<OAuthToken> {
        debug!("refreshing GitHub user token");
        self.oauth_token(json!({
            "client_id": self.client_id,
            "client_secret": self.client_secret,
            "grant_type": "refresh_token",
            "refresh_token": refresh_token,
        }))
        .await
    }

    pub async fn current_user(&self, token: &str) -> Result<GitHubUser> {
        self.get("/user", token).await
    }

    pub async fn user_installations(&self, token: &str) -> Result<Vec<GitHubInstallation>> {
        let list: InstallationList = self.get("/user/installations", token).await?;
        Ok(list.installations)
    }

    /// Mint an installation token; authenticated with the app JWT
    pub async fn installation_token(
        &self,
        app_jwt: &str,
        installation_id: u64,
    ) -> Result<InstallationToken> {
        let path = format!("/app/installations/{}/access_tokens", installation_id);
        self.send(Method::POST, &path, app_jwt, &json!({})).await
    }

    pub async fn installation_repositories(&self, token: &str) -> Result<Vec<GitHubRepository>> {
        let list: RepositoryList = self.get("/installation/repositories", token).await?;
        Ok(list.repositories)
    }

    /// Issues of a repository, pull requests excluded
    pub async fn list_issues(&self, token: &str, repo: &str) -> Result<Vec<GitHubIssue>> {
        let response = self
            .request(Method::GET, &format!("/repos/{}/issues", repo), token)
            .query(&[("state", "all"), ("per_page", PER_PAGE)])
            .send()
            .await?;
        let issues: Vec<GitHubIssue> = self.handle_response(response).await?;
        Ok(issues.into_iter().filter(|i| !i.is_pull_request()).collect())
    }

    pub async fn get_issue(&self, token: &str, repo: &str, number: u64) -> Result<GitHubIssue> {
        self.get(&format!("/repos/{}/issues/{}", repo, number), token)
            .await
    }

    pub async fn create_issue(
        &self,
        token: &str,
        repo: &str,
        issue: &IssuePatch,
    ) -> Result<GitHubIssue> {
        let path = format!("/repos/{}/issues", repo);
        self.send(Method::POST, &path, token, issue).await
    }

    pub async fn patch_issue(
        &self,
        token: &str,
        repo: &str,
        number: u64,
        patch: &IssuePatch,
    ) -> Result<GitHubIssue> {
        let path = format!("/repos/{}/issues/{}", repo, number);
        self.send(Method::PATCH, &path, token, patch).await
    }

    pub async fn list_pulls(&self, token: &str, repo: &str) -> Result<Vec<GitHubPull>> {
        let response = self
            .request(Method::GET, &format!("/repos/{}/pulls", repo), token)
            .query(&[("state", "all"), ("per_page", PER_PAGE)])
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn get_pull(&self, token: &str, repo: &str, number: u64) -> Result<GitHubPull> {
        self.get(&format!("/repos/{}/pulls/{}", repo, number), token)
            .await
    }

    pub async fn patch_pull(
        &self,
        token: &str,
        repo: &str,
        number: u64,
        patch: &IssuePatch,
    ) -> Result<GitHubPull> {
        let path = format!("/repos/{}/pulls/{}", repo, number);
        self.send(Method::PATCH, &path, token, patch).await
    }

    pub async fn merge_pull(&self, token: &str, repo: &str, number: u64) -> Result<MergeResult> {
        let path = format!("/repos/{}/pulls/{}/merge", repo, number);
        self.send(Method::PUT, &path, token, &json!({})).await
    }

    pub async fn collaborators(&self, token: &str, repo: &str) -> Result<Vec<GitHubUser>> {
        self.get(&format!("/repos/{}/collaborators", repo), token)
            .await
    }

    pub async fn branches(&self, token: &str, repo: &str) -> Result<Vec<GitHubBranch>> {
        self.get(&format!("/repos/{}/branches", repo), token).await
    }

    pub async fn create_release(
        &self,
        token: &str,
        repo: &str,
        release: &NewRelease,
    ) -> Result<GitHubRelease> {
        let path = format!("/repos/{}/releases", repo);
        self.send(Method::POST, &path, token, release).await
    }

    pub async fn create_comment(
        &self,
        token: &str,
        repo: &str,
        issue_number: u64,
        body: &str,
    ) -> Result<GitHubComment> {
        let path = format!("/repos/{}/issues/{}/comments", repo, issue_number);
        self.send(Method::POST, &path, token, &json!({ "body": body }))
            .await
    }

    pub async fn patch_comment(
        &self,
        token: &str,
        repo: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<GitHubComment> {
        let path = format!("/repos/{}/issues/comments/{}", repo, comment_id);
        self.send(Method::PATCH, &path, token, &json!({ "body": body }))
            .await
    }
}
