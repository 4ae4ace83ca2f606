//! Inbound webhook deliveries
//!
//! Deliveries are authenticated with the app's webhook secret and then
//! applied to every project linked to the repository they concern.

use std::sync::LazyLock;

use hmac::{Hmac, Mac};
use regex::Regex;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vernite_core::task::Task;
use vernite_core::Error;

use crate::api::{GitHubComment, GitHubIssue, GitHubPull, GitHubUser};
use crate::error::GitHubError;
use crate::model::{CommentIntegration, IntegrationKind, TaskIntegration};
use crate::service::GitHubService;
use crate::Result;

type HmacSha256 = Hmac<Sha256>;

/// `close!12` or `!12` closes task 12, `reopen!12` reopens it
static COMMIT_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(reopen|close)?!(\d+)").expect("valid commit keyword pattern")
});

/// Check an `X-Hub-Signature-256` header against the raw request body.
pub fn verify_signature(secret: &str, body: &[u8], header: Option<&str>) -> Result<()> {
    let signature = header
        .and_then(|value| value.trim().strip_prefix("sha256="))
        .ok_or(GitHubError::Signature)?;
    let expected = hex::decode(signature).map_err(|_| GitHubError::Signature)?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| GitHubError::Signature)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| GitHubError::Signature)
}

/// The fields of a delivery that any handled event reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub repository: Option<RepositoryRef>,
    #[serde(default)]
    pub installation: Option<InstallationRef>,
    #[serde(default)]
    pub issue: Option<GitHubIssue>,
    #[serde(default)]
    pub pull_request: Option<GitHubPull>,
    #[serde(default)]
    pub comment: Option<GitHubComment>,
    #[serde(default)]
    pub assignee: Option<GitHubUser>,
    #[serde(default)]
    pub commits: Vec<Commit>,
    #[serde(default)]
    pub repositories_removed: Vec<RepositoryRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryRef {
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallationRef {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    #[serde(default)]
    pub message: String,
}

/// First close/reopen keyword of a commit message as `(open, task number)`
pub fn commit_keyword(message: &str) -> Option<(bool, u64)> {
    let captures = COMMIT_KEYWORD.captures(message)?;
    let open = captures.get(1).is_some_and(|m| m.as_str() == "reopen");
    let number = captures.get(2)?.as_str().parse().ok()?;
    Some((open, number))
}

/// Tasks can vanish locally while GitHub still refers to them
fn skip_missing<T>(result: vernite_core::Result<T>) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(Error::NotFound(message)) => {
            debug!(message = %message, "webhook target no longer exists");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn missing(field: &str) -> GitHubError {
    GitHubError::Payload(format!("delivery has no {}", field))
}

impl GitHubService {
    /// Verify, parse and apply one delivery. Unknown events are accepted
    /// and ignored.
    pub async fn handle_webhook(
        &self,
        event: &str,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<()> {
        verify_signature(&self.webhook_secret, body, signature)?;
        let payload: WebhookPayload = serde_json::from_slice(body)
            .map_err(|e| GitHubError::Payload(format!("malformed webhook body: {}", e)))?;
        self.dispatch(event, payload).await
    }

    pub async fn dispatch(&self, event: &str, payload: WebhookPayload) -> Result<()> {
        info!(event = %event, action = %payload.action, "GitHub webhook received");
        match event {
            "installation" => self.on_installation(payload).await,
            "installation_repositories" => self.on_installation_repositories(payload).await,
            "issues" => self.on_issue(payload).await,
            "pull_request" => self.on_pull_request(payload).await,
            "push" => self.on_push(payload).await,
            "issue_comment" => self.on_issue_comment(payload).await,
            _ => Ok(()),
        }
    }

    async fn on_installation(&self, payload: WebhookPayload) -> Result<()> {
        let id = payload.installation.ok_or_else(|| missing("installation"))?.id;
        if self.store.installation(id).await.is_none() {
            return Ok(());
        }
        match payload.action.as_str() {
            "suspend" => {
                self.store.set_suspended(id, true).await?;
            }
            "unsuspend" => {
                self.store.set_suspended(id, false).await?;
            }
            "deleted" => {
                self.store.remove_installation(id).await?;
                for integration in self.store.projects_for_installation(id).await {
                    self.store.remove_project(integration.id).await?;
                }
                info!(installation_id = id, "GitHub installation removed");
            }
            _ => {}
        }
        Ok(())
    }

    async fn on_installation_repositories(&self, payload: WebhookPayload) -> Result<()> {
        let installation_id = payload.installation.map(|i| i.id);
        for repository in &payload.repositories_removed {
            for integration in self.store.projects_for_repository(&repository.full_name).await {
                if installation_id.is_some_and(|id| id != integration.installation_id) {
                    continue;
                }
                self.store.remove_project(integration.id).await?;
                info!(
                    project_id = %integration.project_id,
                    repository = %repository.full_name,
                    "repository access revoked, integration removed"
                );
            }
        }
        Ok(())
    }

    async fn assign_from(&self, task_id: Uuid, assignee: Option<&GitHubUser>) -> Result<()> {
        let Some(account) = assignee else {
            return Ok(());
        };
        let Some(authorization) = self.store.authorization(account.id).await else {
            debug!(login = %account.login, "assignee has no linked account");
            return Ok(());
        };
        skip_missing(
            self.tracker
                .sync_set_assignee(task_id, Some(authorization.user_id))
                .await,
        )
    }

    async fn on_issue(&self, payload: WebhookPayload) -> Result<()> {
        let repository = payload.repository.as_ref().ok_or_else(|| missing("repository"))?;
        let issue = payload.issue.as_ref().ok_or_else(|| missing("issue"))?;
        let body = issue.body.as_deref().unwrap_or_default();

        for integration in self.store.projects_for_repository(&repository.full_name).await {
            let links = self
                .store
                .tasks_for_issue(integration.id, IntegrationKind::Issue, issue.number)
                .await;

            if payload.action == "opened" && links.is_empty() {
                let task = self
                    .tracker
                    .sync_create_task(integration.project_id, &issue.title, body)
                    .await?;
                self.store
                    .save_task(TaskIntegration::new(
                        task.id,
                        integration.id,
                        IntegrationKind::Issue,
                        issue.number,
                    ))
                    .await?;
                info!(
                    project_id = %integration.project_id,
                    number = task.number,
                    issue = issue.number,
                    "task created from issue"
                );
                continue;
            }

            for link in links {
                let task_id = link.task_id;
                match payload.action.as_str() {
                    "edited" => skip_missing(
                        self.tracker
                            .sync_edit_task(task_id, Some(&issue.title), Some(body))
                            .await,
                    )?,
                    "closed" => skip_missing(self.tracker.set_task_open(task_id, false).await)?,
                    "reopened" => skip_missing(self.tracker.set_task_open(task_id, true).await)?,
                    "deleted" => {
                        self.store.remove_task_links(task_id).await?;
                        self.tracker.sync_delete_task(task_id).await?;
                    }
                    "assigned" => self.assign_from(task_id, payload.assignee.as_ref()).await?,
                    "unassigned" => {
                        skip_missing(self.tracker.sync_set_assignee(task_id, None).await)?
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    async fn on_pull_request(&self, payload: WebhookPayload) -> Result<()> {
        let repository = payload.repository.as_ref().ok_or_else(|| missing("repository"))?;
        let pull = payload
            .pull_request
            .as_ref()
            .ok_or_else(|| missing("pull_request"))?;

        for integration in self.store.projects_for_repository(&repository.full_name).await {
            let links = self
                .store
                .tasks_for_issue(integration.id, IntegrationKind::PullRequest, pull.number)
                .await;
            for mut link in links {
                let task_id = link.task_id;
                match payload.action.as_str() {
                    "closed" | "reopened" => {
                        if pull.is_merged() && !link.merged {
                            link.merged = true;
                            self.store.save_task(link).await?;
                        }
                        skip_missing(
                            self.tracker
                                .set_task_open(task_id, pull.state == "open")
                                .await,
                        )?;
                    }
                    "edited" => skip_missing(
                        self.tracker
                            .sync_edit_task(
                                task_id,
                                Some(&pull.title),
                                Some(pull.body.as_deref().unwrap_or_default()),
                            )
                            .await,
                    )?,
                    "assigned" => self.assign_from(task_id, payload.assignee.as_ref()).await?,
                    "unassigned" => {
                        skip_missing(self.tracker.sync_set_assignee(task_id, None).await)?
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    async fn on_push(&self, payload: WebhookPayload) -> Result<()> {
        let repository = payload.repository.as_ref().ok_or_else(|| missing("repository"))?;
        let mut changed: Vec<Task> = Vec::new();

        for integration in self.store.projects_for_repository(&repository.full_name).await {
            for commit in &payload.commits {
                let Some((open, number)) = commit_keyword(&commit.message) else {
                    continue;
                };
                let Some(task) = self
                    .tracker
                    .task_by_number(integration.project_id, number)
                    .await?
                else {
                    continue;
                };
                let task = self.tracker.change_state(task, open).await?;
                debug!(project_id = %integration.project_id, number, open, "task state changed by commit");
                changed.push(task);
            }
        }

        for task in &changed {
            if let Err(err) = self.patch_issue(task).await {
                warn!(task_id = %task.id, error = %err, "failed to sync issue after push");
            }
        }
        Ok(())
    }

    async fn on_issue_comment(&self, payload: WebhookPayload) -> Result<()> {
        let comment = payload.comment.as_ref().ok_or_else(|| missing("comment"))?;

        match payload.action.as_str() {
            "created" => {
                if comment.posted_by_app(self.signer.app_id())
                    || self.store.comment(comment.id).await.is_some()
                {
                    return Ok(());
                }
                let repository = payload.repository.as_ref().ok_or_else(|| missing("repository"))?;
                let issue = payload.issue.as_ref().ok_or_else(|| missing("issue"))?;
                let kind = if issue.is_pull_request() {
                    IntegrationKind::PullRequest
                } else {
                    IntegrationKind::Issue
                };

                for integration in self.store.projects_for_repository(&repository.full_name).await {
                    for link in self
                        .store
                        .tasks_for_issue(integration.id, kind, issue.number)
                        .await
                    {
                        let created = match self
                            .tracker
                            .sync_add_comment(link.task_id, &comment.body)
                            .await
                        {
                            Ok(created) => created,
                            Err(Error::NotFound(_)) => continue,
                            Err(err) => return Err(err.into()),
                        };
                        self.store
                            .save_comment(CommentIntegration {
                                github_comment_id: comment.id,
                                comment_id: created.id,
                                integration_id: integration.id,
                            })
                            .await?;
                    }
                }
            }
            "edited" => {
                if let Some(mapping) = self.store.comment(comment.id).await {
                    skip_missing(
                        self.tracker
                            .sync_edit_comment(mapping.comment_id, &comment.body)
                            .await,
                    )?;
                }
            }
            "deleted" => {
                if let Some(mapping) = self.store.remove_comment(comment.id).await? {
                    self.tracker.sync_delete_comment(mapping.comment_id).await?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
