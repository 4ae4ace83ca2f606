//! GitHub integration service
//!
//! Owns the OAuth handshake, installation token refresh and the mapping
//! between tasks and repository issues or pull requests. Membership checks
//! for project scoped reads happen here; task scoped operations expect the
//! caller to have gone through the tracker first.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vernite_core::comment::Comment;
use vernite_core::git::{Branch, Issue, IssueAction, PullAction, PullRequest, Repository};
use vernite_core::release::Release;
use vernite_core::task::Task;
use vernite_core::{Error, Tracker};

use crate::api::IssuePatch;
use crate::app_jwt::AppSigner;
use crate::client::GitHubClient;
use crate::config::GitHubConfig;
use crate::error::GitHubError;
use crate::model::{
    split_full_name, Authorization, CommentIntegration, GitHubAccount, Installation,
    IntegrationKind, ProjectIntegration, TaskIntegration, TaskLinks,
};
use crate::store::IntegrationStore;
use crate::Result;

/// How long an OAuth `state` value stays redeemable
pub const STATE_TTL_MINUTES: i64 = 10;

struct PendingState {
    user_id: Uuid,
    expires: DateTime<Utc>,
}

/// A project integration with a usable installation token
struct RepoContext {
    integration: ProjectIntegration,
    token: String,
}

impl RepoContext {
    fn repo(&self) -> String {
        self.integration.full_name()
    }
}

pub struct GitHubService {
    pub(crate) client: GitHubClient,
    pub(crate) signer: AppSigner,
    pub(crate) webhook_secret: String,
    pub(crate) store: IntegrationStore,
    pub(crate) tracker: Arc<Tracker>,
    states: Mutex<HashMap<String, PendingState>>,
}

impl GitHubService {
    pub async fn new(config: &GitHubConfig, tracker: Arc<Tracker>) -> Result<Self> {
        let client = GitHubClient::with_base_urls(
            &config.api_url,
            &config.oauth_url,
            &config.client_id,
            &config.client_secret,
        )?;
        let signer = AppSigner::from_pem(config.app_id, &config.private_key_pem)?;
        let store = IntegrationStore::open(&tracker.data_dir().join("github")).await?;

        Ok(Self {
            client,
            signer,
            webhook_secret: config.webhook_secret.clone(),
            store,
            tracker,
            states: Mutex::new(HashMap::new()),
        })
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    // OAuth

    /// Start linking a GitHub account to `user_id`
    pub async fn authorization_url(&self, user_id: Uuid) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let state = URL_SAFE_NO_PAD.encode(bytes);

        let now = Utc::now();
        let mut states = self.states.lock().await;
        states.retain(|_, pending| pending.expires > now);
        states.insert(
            state.clone(),
            PendingState {
                user_id,
                expires: now + Duration::minutes(STATE_TTL_MINUTES),
            },
        );

        format!(
            "{}/login/oauth/authorize?client_id={}&state={}",
            self.client.oauth_url(),
            urlencoding::encode(self.client.client_id()),
            urlencoding::encode(&state)
        )
    }

    /// Redeem the OAuth callback. The state is consumed even on failure.
    pub async fn complete_authorization(&self, code: &str, state: &str) -> Result<GitHubAccount> {
        let pending = self.states.lock().await.remove(state);
        let user_id = match pending {
            Some(pending) if pending.expires > Utc::now() => pending.user_id,
            _ => {
                return Err(Error::InvalidInput(
                    "authorization state is invalid or expired".to_string(),
                )
                .into())
            }
        };

        let token = self.client.exchange_code(code).await?;
        let account = self.client.current_user(&token.access_token).await?;

        let authorization = match self.store.authorization(account.id).await {
            Some(mut existing) => {
                existing.refresh(&token);
                existing.login = account.login.clone();
                existing.avatar_url = account.avatar_url.clone();
                existing.user_id = user_id;
                existing
            }
            None => Authorization::new(user_id, &account, &token),
        };
        let authorization = self.store.save_authorization(authorization).await?;

        info!(user_id = %user_id, login = %authorization.login, "GitHub account linked");
        Ok(GitHubAccount::from(&authorization))
    }

    pub async fn list_authorizations(&self, user_id: Uuid) -> Vec<GitHubAccount> {
        self.store
            .authorizations_for_user(user_id)
            .await
            .iter()
            .map(GitHubAccount::from)
            .collect()
    }

    pub async fn delete_authorization(&self, user_id: Uuid, id: u64) -> Result<()> {
        match self.store.authorization(id).await {
            Some(authorization) if authorization.user_id == user_id => {
                self.store.remove_authorization(id).await?;
                info!(user_id = %user_id, login = %authorization.login, "GitHub account unlinked");
                Ok(())
            }
            _ => Err(Error::not_found("GitHub authorization", id).into()),
        }
    }

    async fn fresh_authorization(&self, mut authorization: Authorization) -> Result<Authorization> {
        if !authorization.should_refresh_token() {
            return Ok(authorization);
        }
        let Some(refresh_token) = authorization.refresh_token.clone() else {
            return Err(GitHubError::Api {
                status: 401,
                message: format!("token of {} expired", authorization.login),
            });
        };
        let token = self.client.refresh_user_token(&refresh_token).await?;
        authorization.refresh(&token);
        debug!(login = %authorization.login, "GitHub user token refreshed");
        Ok(self.store.save_authorization(authorization).await?)
    }

    // Installations

    /// App installations reachable through any of the user's linked accounts
    async fn user_installations(&self, user_id: Uuid) -> Result<Vec<Installation>> {
        let mut installations: Vec<Installation> = Vec::new();
        for authorization in self.store.authorizations_for_user(user_id).await {
            let authorization = self.fresh_authorization(authorization).await?;
            let remote = self
                .client
                .user_installations(&authorization.access_token)
                .await?;

            for remote in remote
                .iter()
                .filter(|i| i.app_id == self.signer.app_id())
            {
                let installation = match self.store.installation(remote.id).await {
                    Some(mut existing) => {
                        existing.update(remote);
                        existing
                    }
                    None => Installation::new(remote),
                };
                let installation = self.store.save_installation(installation).await?;
                if !installations.iter().any(|i| i.id == installation.id) {
                    installations.push(installation);
                }
            }
        }
        Ok(installations)
    }

    /// Current token of an installation, minting a new one when expired.
    /// Suspended installations yield `None`.
    async fn installation_token(&self, mut installation: Installation) -> Result<Option<String>> {
        if installation.suspended {
            return Ok(None);
        }
        if !installation.should_refresh_token() {
            return Ok(Some(installation.token));
        }

        let jwt = self.signer.sign()?;
        let token = self.client.installation_token(&jwt, installation.id).await?;
        installation.refresh(token);
        debug!(installation_id = installation.id, "installation token refreshed");

        let installation = self.store.save_installation(installation).await?;
        Ok(Some(installation.token))
    }

    pub async fn user_repositories(&self, user_id: Uuid) -> Result<Vec<Repository>> {
        let mut repositories: Vec<Repository> = Vec::new();
        for installation in self.user_installations(user_id).await? {
            let Some(token) = self.installation_token(installation).await? else {
                continue;
            };
            for repo in self.client.installation_repositories(&token).await? {
                if !repositories.iter().any(|r| r.id == repo.id) {
                    repositories.push(repo.into());
                }
            }
        }
        repositories.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(repositories)
    }

    // Project integrations

    pub async fn project_integration(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<Option<ProjectIntegration>> {
        self.tracker.get_project(user_id, project_id).await?;
        Ok(self.store.project(project_id).await)
    }

    pub async fn create_project_integration(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        full_name: &str,
    ) -> Result<ProjectIntegration> {
        self.tracker.get_project(user_id, project_id).await?;
        split_full_name(full_name)?;
        if self.store.project(project_id).await.is_some() {
            return Err(Error::InvalidInput(
                "project already has a GitHub integration".to_string(),
            )
            .into());
        }

        for installation in self.user_installations(user_id).await? {
            let installation_id = installation.id;
            let Some(token) = self.installation_token(installation).await? else {
                continue;
            };
            let repositories = self.client.installation_repositories(&token).await?;
            if let Some(repo) = repositories
                .iter()
                .find(|r| r.full_name.eq_ignore_ascii_case(full_name.trim()))
            {
                let integration =
                    ProjectIntegration::new(project_id, &repo.full_name, installation_id)?;
                let integration = self.store.save_project(integration).await?;
                info!(
                    project_id = %project_id,
                    repository = %repo.full_name,
                    "project linked to GitHub repository"
                );
                return Ok(integration);
            }
        }

        Err(GitHubError::NoRepositoryAccess(full_name.trim().to_string()))
    }

    pub async fn delete_project_integration(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<()> {
        self.tracker.get_project(user_id, project_id).await?;
        match self.store.project_by_id(id).await {
            Some(integration) if integration.project_id == project_id => {
                self.store.remove_project(id).await?;
                info!(project_id = %project_id, "GitHub integration removed");
                Ok(())
            }
            _ => Err(Error::not_found("GitHub integration", id).into()),
        }
    }

    async fn repo_context(&self, project_id: Uuid) -> Result<Option<RepoContext>> {
        let Some(integration) = self.store.project(project_id).await else {
            return Ok(None);
        };
        let Some(installation) = self.store.installation(integration.installation_id).await else {
            warn!(
                installation_id = integration.installation_id,
                "integration refers to a missing installation"
            );
            return Ok(None);
        };
        Ok(self
            .installation_token(installation)
            .await?
            .map(|token| RepoContext { integration, token }))
    }

    pub async fn issues(&self, user_id: Uuid, project_id: Uuid) -> Result<Vec<Issue>> {
        self.tracker.get_project(user_id, project_id).await?;
        let Some(ctx) = self.repo_context(project_id).await? else {
            return Ok(Vec::new());
        };
        let issues = self.client.list_issues(&ctx.token, &ctx.repo()).await?;
        Ok(issues.into_iter().map(Issue::from).collect())
    }

    pub async fn pull_requests(&self, user_id: Uuid, project_id: Uuid) -> Result<Vec<PullRequest>> {
        self.tracker.get_project(user_id, project_id).await?;
        let Some(ctx) = self.repo_context(project_id).await? else {
            return Ok(Vec::new());
        };
        let pulls = self.client.list_pulls(&ctx.token, &ctx.repo()).await?;
        Ok(pulls.into_iter().map(PullRequest::from).collect())
    }

    pub async fn branches(&self, user_id: Uuid, project_id: Uuid) -> Result<Vec<Branch>> {
        self.tracker.get_project(user_id, project_id).await?;
        let Some(ctx) = self.repo_context(project_id).await? else {
            return Ok(Vec::new());
        };
        let branches = self.client.branches(&ctx.token, &ctx.repo()).await?;
        Ok(branches.into_iter().map(Branch::from).collect())
    }

    // Issues and pull requests of tasks

    /// Logins of repository collaborators linked to the task's assignee
    async fn assignee_logins(&self, ctx: &RepoContext, task: &Task) -> Result<Vec<String>> {
        let Some(assignee) = task.assignee_id else {
            return Ok(Vec::new());
        };
        let accounts: HashSet<u64> = self
            .store
            .authorizations_for_user(assignee)
            .await
            .iter()
            .map(|a| a.id)
            .collect();
        if accounts.is_empty() {
            return Ok(Vec::new());
        }
        let collaborators = self.client.collaborators(&ctx.token, &ctx.repo()).await?;
        Ok(collaborators
            .into_iter()
            .filter(|c| accounts.contains(&c.id))
            .map(|c| c.login)
            .collect())
    }

    pub async fn connect_issue(&self, task: &Task, number: u64) -> Result<Option<Issue>> {
        let Some(ctx) = self.repo_context(task.project_id).await? else {
            return Ok(None);
        };
        let issue = self.client.get_issue(&ctx.token, &ctx.repo(), number).await?;
        if issue.is_pull_request() {
            return Err(Error::InvalidInput(format!("#{} is a pull request", number)).into());
        }
        self.store
            .save_task(TaskIntegration::new(
                task.id,
                ctx.integration.id,
                IntegrationKind::Issue,
                number,
            ))
            .await?;
        debug!(task_id = %task.id, number, "task linked to issue");
        self.patch_issue(task).await
    }

    pub async fn create_issue(&self, task: &Task) -> Result<Option<Issue>> {
        let Some(ctx) = self.repo_context(task.project_id).await? else {
            return Ok(None);
        };
        let patch = IssuePatch {
            title: Some(task.name.clone()),
            body: Some(task.description.clone()),
            state: None,
            assignees: Some(self.assignee_logins(&ctx, task).await?),
        };
        let issue = self
            .client
            .create_issue(&ctx.token, &ctx.repo(), &patch)
            .await?;
        self.store
            .save_task(TaskIntegration::new(
                task.id,
                ctx.integration.id,
                IntegrationKind::Issue,
                issue.number,
            ))
            .await?;
        debug!(task_id = %task.id, number = issue.number, "issue created for task");
        Ok(Some(issue.into()))
    }

    /// Push the task's name, description, state and assignee to its issue
    pub async fn patch_issue(&self, task: &Task) -> Result<Option<Issue>> {
        let Some(link) = self.store.task(task.id, IntegrationKind::Issue).await else {
            return Ok(None);
        };
        let Some(ctx) = self.repo_context(task.project_id).await? else {
            return Ok(None);
        };
        let state = if self.tracker.is_done(task).await {
            "closed"
        } else {
            "open"
        };
        let patch = IssuePatch {
            title: Some(task.name.clone()),
            body: Some(task.description.clone()),
            state: Some(state.to_string()),
            assignees: Some(self.assignee_logins(&ctx, task).await?),
        };
        let issue = self
            .client
            .patch_issue(&ctx.token, &ctx.repo(), link.issue_id, &patch)
            .await?;
        Ok(Some(issue.into()))
    }

    pub async fn detach_issue(&self, task: &Task) -> Result<()> {
        self.store.remove_task(task.id, IntegrationKind::Issue).await?;
        Ok(())
    }

    pub async fn connect_pull(&self, task: &Task, number: u64) -> Result<Option<PullRequest>> {
        let Some(ctx) = self.repo_context(task.project_id).await? else {
            return Ok(None);
        };
        let pull = self.client.get_pull(&ctx.token, &ctx.repo(), number).await?;
        let mut link = TaskIntegration::new(
            task.id,
            ctx.integration.id,
            IntegrationKind::PullRequest,
            number,
        );
        link.merged = pull.is_merged();
        link.branch = Some(pull.head.name.clone());
        self.store.save_task(link).await?;
        debug!(task_id = %task.id, number, "task linked to pull request");
        Ok(Some(pull.into()))
    }

    /// Merge the pull request once the task is done, otherwise push the
    /// task's name, description and assignee to it
    pub async fn patch_pull(&self, task: &Task) -> Result<Option<PullRequest>> {
        let Some(mut link) = self.store.task(task.id, IntegrationKind::PullRequest).await else {
            return Ok(None);
        };
        let Some(ctx) = self.repo_context(task.project_id).await? else {
            return Ok(None);
        };
        let repo = ctx.repo();
        let number = link.issue_id;

        if self.tracker.is_done(task).await {
            if !link.merged {
                let result = self.client.merge_pull(&ctx.token, &repo, number).await?;
                link.merged = result.merged;
                self.store.save_task(link).await?;
                info!(task_id = %task.id, number, merged = result.merged, "pull request merge requested");
            }
            let pull = self.client.get_pull(&ctx.token, &repo, number).await?;
            return Ok(Some(pull.into()));
        }

        let patch = IssuePatch {
            title: Some(task.name.clone()),
            body: Some(task.description.clone()),
            state: None,
            assignees: Some(self.assignee_logins(&ctx, task).await?),
        };
        let pull = self
            .client
            .patch_pull(&ctx.token, &repo, number, &patch)
            .await?;
        Ok(Some(pull.into()))
    }

    pub async fn detach_pull(&self, task: &Task) -> Result<()> {
        self.store
            .remove_task(task.id, IntegrationKind::PullRequest)
            .await?;
        Ok(())
    }

    /// Apply the issue and pull request requested alongside a task create or
    /// update. Without an explicit action the existing links are refreshed.
    pub async fn apply_task_actions(
        &self,
        task: &Task,
        issue: Option<IssueAction>,
        pull: Option<PullAction>,
    ) -> Result<()> {
        match issue {
            Some(IssueAction::Create) => {
                self.create_issue(task).await?;
            }
            Some(IssueAction::Detach) => self.detach_issue(task).await?,
            Some(IssueAction::Attach(issue)) => {
                self.connect_issue(task, issue.id).await?;
            }
            None => {
                self.patch_issue(task).await?;
            }
        }

        match pull {
            Some(PullAction::Detach) => self.detach_pull(task).await?,
            Some(PullAction::Attach(pull)) => {
                self.connect_pull(task, pull.id).await?;
            }
            None => {
                self.patch_pull(task).await?;
            }
        }
        Ok(())
    }

    pub async fn task_links(&self, task: &Task) -> TaskLinks {
        let Some(integration) = self.store.project(task.project_id).await else {
            return TaskLinks::default();
        };
        let issue = self.store.task(task.id, IntegrationKind::Issue).await;
        let pull = self.store.task(task.id, IntegrationKind::PullRequest).await;
        TaskLinks {
            issue: issue.as_ref().map(|link| link.link(&integration)),
            merged: pull.as_ref().is_some_and(|link| link.merged),
            pull: pull.as_ref().map(|link| link.link(&integration)),
        }
    }

    /// Drop the links of a deleted task
    pub async fn forget_task(&self, task_id: Uuid) -> Result<()> {
        self.store.remove_task_links(task_id).await?;
        Ok(())
    }

    // Releases and comments

    /// Publish a release on the linked repository, returning its GitHub id
    pub async fn publish_release(
        &self,
        release: &Release,
        branch: Option<String>,
    ) -> Result<Option<u64>> {
        let Some(ctx) = self.repo_context(release.project_id).await? else {
            return Ok(None);
        };
        let request = crate::api::NewRelease::new(&release.name, &release.description, branch);
        let created = self
            .client
            .create_release(&ctx.token, &ctx.repo(), &request)
            .await?;
        info!(release_id = %release.id, github_id = created.id, "release published on GitHub");
        Ok(Some(created.id))
    }

    /// Post a new comment to the task's issue or update the one it was
    /// already mirrored to
    pub async fn mirror_comment(&self, task: &Task, comment: &Comment) -> Result<Option<u64>> {
        let Some(link) = self.store.task(task.id, IntegrationKind::Issue).await else {
            return Ok(None);
        };
        let Some(ctx) = self.repo_context(task.project_id).await? else {
            return Ok(None);
        };
        let repo = ctx.repo();

        if let Some(existing) = self.store.comment_for(comment.id).await {
            self.client
                .patch_comment(&ctx.token, &repo, existing.github_comment_id, &comment.content)
                .await?;
            return Ok(Some(existing.github_comment_id));
        }

        let posted = self
            .client
            .create_comment(&ctx.token, &repo, link.issue_id, &comment.content)
            .await?;
        self.store
            .save_comment(CommentIntegration {
                github_comment_id: posted.id,
                comment_id: comment.id,
                integration_id: ctx.integration.id,
            })
            .await?;
        Ok(Some(posted.id))
    }

    pub async fn forget_comment(&self, comment_id: Uuid) -> Result<()> {
        self.store.remove_comment_links(comment_id).await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;
    use vernite_core::project::{CreateProjectRequest, Project};
    use vernite_core::task::CreateTaskRequest;

    pub(crate) const PRIVATE_KEY: &[u8] = include_bytes!("../tests/fixtures/app-key.pem");
    pub(crate) const APP_ID: u64 = 1000;
    pub(crate) const WEBHOOK_SECRET: &str = "webhook-secret";
    pub(crate) const INSTALLATION_ID: u64 = 5;

    pub(crate) struct Fixture {
        pub service: GitHubService,
        pub owner: Uuid,
        pub project: Project,
        _dir: TempDir,
    }

    pub(crate) async fn fixture(base_url: &str) -> Fixture {
        let dir = TempDir::new().unwrap();
        let tracker = Arc::new(Tracker::open(dir.path()).await.unwrap());
        let owner = Uuid::new_v4();
        let workspace = tracker.create_workspace(owner, "Work").await.unwrap();
        let project = tracker
            .create_project(
                owner,
                CreateProjectRequest {
                    name: "Board".to_string(),
                    description: String::new(),
                    workspace_id: workspace.id,
                },
            )
            .await
            .unwrap()
            .project;

        let config = GitHubConfig {
            app_id: APP_ID,
            client_id: "client-1".to_string(),
            client_secret: "secret".to_string(),
            private_key_pem: PRIVATE_KEY.to_vec(),
            webhook_secret: WEBHOOK_SECRET.to_string(),
            api_url: base_url.to_string(),
            oauth_url: base_url.to_string(),
        };
        let service = GitHubService::new(&config, tracker).await.unwrap();

        Fixture {
            service,
            owner,
            project,
            _dir: dir,
        }
    }

    impl Fixture {
        /// Link the project to `acme/app` through an installation whose
        /// token is still valid
        pub(crate) async fn integrate(&self) -> ProjectIntegration {
            self.service
                .store
                .save_installation(Installation {
                    id: INSTALLATION_ID,
                    token: "inst-token".to_string(),
                    expires: Utc::now() + Duration::hours(1),
                    target_type: "Organization".to_string(),
                    suspended: false,
                })
                .await
                .unwrap();
            self.service
                .store
                .save_project(
                    ProjectIntegration::new(self.project.id, "acme/app", INSTALLATION_ID).unwrap(),
                )
                .await
                .unwrap()
        }

        pub(crate) async fn task(&self, name: &str) -> Task {
            let tracker = &self.service.tracker;
            let status = tracker
                .list_statuses(self.owner, self.project.id)
                .await
                .unwrap()
                .remove(0);
            tracker
                .create_task(
                    self.owner,
                    self.project.id,
                    CreateTaskRequest::named(name, status.id),
                )
                .await
                .unwrap()
        }

        pub(crate) async fn link(
            &self,
            task: &Task,
            integration: &ProjectIntegration,
            kind: IntegrationKind,
            number: u64,
        ) {
            self.service
                .store
                .save_task(TaskIntegration::new(task.id, integration.id, kind, number))
                .await
                .unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::api::OAuthToken;
    use httpmock::prelude::*;
    use serde_json::json;
    use vernite_core::release::CreateReleaseRequest;

    fn user_token() -> OAuthToken {
        OAuthToken {
            access_token: "ghu_user".to_string(),
            expires_in: None,
            refresh_token: None,
            refresh_token_expires_in: None,
            token_type: "bearer".to_string(),
            scope: String::new(),
            error: None,
            error_description: None,
        }
    }

    async fn link_account(fx: &Fixture) {
        let account = crate::api::GitHubUser {
            id: 77,
            login: "octo".to_string(),
            avatar_url: String::new(),
        };
        fx.service
            .store
            .save_authorization(Authorization::new(fx.owner, &account, &user_token()))
            .await
            .unwrap();
    }

    fn mock_installations(server: &MockServer, repository: &str) {
        server.mock(|when, then| {
            when.method(GET)
                .path("/user/installations")
                .header("Authorization", "Bearer ghu_user");
            then.status(200).json_body(json!({
                "total_count": 2,
                "installations": [
                    { "id": INSTALLATION_ID, "app_id": APP_ID, "target_type": "Organization" },
                    { "id": 6, "app_id": 1, "target_type": "User" }
                ]
            }));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path(format!("/app/installations/{}/access_tokens", INSTALLATION_ID));
            then.status(201).json_body(json!({
                "token": "ghs_fresh",
                "expires_at": "2099-01-01T00:00:00Z"
            }));
        });
        let repository = repository.to_string();
        server.mock(move |when, then| {
            when.method(GET)
                .path("/installation/repositories")
                .header("Authorization", "Bearer ghs_fresh");
            then.status(200).json_body(json!({
                "total_count": 1,
                "repositories": [{
                    "id": 11,
                    "name": repository.split('/').nth(1).unwrap_or_default(),
                    "full_name": repository,
                    "html_url": format!("https://github.com/{}", repository),
                    "private": false
                }]
            }));
        });
    }

    #[tokio::test]
    async fn test_authorization_state_is_single_use() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/login/oauth/access_token");
            then.status(200)
                .json_body(json!({ "access_token": "ghu_user", "token_type": "bearer" }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/user");
            then.status(200)
                .json_body(json!({ "id": 77, "login": "octo", "avatar_url": "" }));
        });

        let fx = fixture(&server.base_url()).await;
        let url = fx.service.authorization_url(fx.owner).await;
        assert!(url.contains("client_id=client-1"));
        let state = url.split("state=").nth(1).unwrap().to_string();

        let account = fx
            .service
            .complete_authorization("code", &state)
            .await
            .unwrap();
        assert_eq!(account.login, "octo");
        assert_eq!(fx.service.list_authorizations(fx.owner).await.len(), 1);

        let replay = fx.service.complete_authorization("code", &state).await;
        assert!(matches!(
            replay,
            Err(GitHubError::Core(Error::InvalidInput(_)))
        ));
    }

    #[tokio::test]
    async fn test_delete_authorization_of_other_user_is_not_found() {
        let fx = fixture("http://127.0.0.1:9").await;
        link_account(&fx).await;

        let result = fx.service.delete_authorization(Uuid::new_v4(), 77).await;
        assert!(matches!(result, Err(GitHubError::Core(Error::NotFound(_)))));

        fx.service.delete_authorization(fx.owner, 77).await.unwrap();
        assert!(fx.service.list_authorizations(fx.owner).await.is_empty());
    }

    #[tokio::test]
    async fn test_create_project_integration() {
        let server = MockServer::start();
        mock_installations(&server, "acme/app");

        let fx = fixture(&server.base_url()).await;
        link_account(&fx).await;

        let integration = fx
            .service
            .create_project_integration(fx.owner, fx.project.id, "acme/app")
            .await
            .unwrap();
        assert_eq!(integration.installation_id, INSTALLATION_ID);
        assert_eq!(
            fx.service.store.installation(INSTALLATION_ID).await.unwrap().token,
            "ghs_fresh"
        );
        assert!(fx.service.store.installation(6).await.is_none());

        let again = fx
            .service
            .create_project_integration(fx.owner, fx.project.id, "acme/app")
            .await;
        assert!(matches!(
            again,
            Err(GitHubError::Core(Error::InvalidInput(_)))
        ));
    }

    async fn link_expired_account(fx: &Fixture, refresh_token: Option<&str>) {
        let account = crate::api::GitHubUser {
            id: 77,
            login: "octo".to_string(),
            avatar_url: String::new(),
        };
        let mut authorization = Authorization::new(fx.owner, &account, &user_token());
        authorization.access_token = "ghu_old".to_string();
        authorization.expires = Some(Utc::now() - Duration::minutes(5));
        authorization.refresh_token = refresh_token.map(str::to_string);
        fx.service
            .store
            .save_authorization(authorization)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_expired_user_token_is_refreshed_and_saved() {
        let server = MockServer::start();
        let refresh = server.mock(|when, then| {
            when.method(POST)
                .path("/login/oauth/access_token")
                .json_body_includes(
                    json!({ "grant_type": "refresh_token", "refresh_token": "ghr_old" })
                        .to_string(),
                );
            then.status(200).json_body(json!({
                "access_token": "ghu_new",
                "expires_in": 28800,
                "refresh_token": "ghr_new",
                "refresh_token_expires_in": 15897600,
                "token_type": "bearer",
                "scope": ""
            }));
        });
        let installations = server.mock(|when, then| {
            when.method(GET)
                .path("/user/installations")
                .header("Authorization", "Bearer ghu_new");
            then.status(200)
                .json_body(json!({ "total_count": 0, "installations": [] }));
        });

        let fx = fixture(&server.base_url()).await;
        link_expired_account(&fx, Some("ghr_old")).await;

        let repositories = fx.service.user_repositories(fx.owner).await.unwrap();
        assert!(repositories.is_empty());
        refresh.assert();
        installations.assert();

        let saved = fx.service.store.authorization(77).await.unwrap();
        assert_eq!(saved.access_token, "ghu_new");
        assert_eq!(saved.refresh_token.as_deref(), Some("ghr_new"));
        assert!(!saved.should_refresh_token());
    }

    #[tokio::test]
    async fn test_expired_user_token_without_refresh_token_fails() {
        let server = MockServer::start();
        let refresh = server.mock(|when, then| {
            when.method(POST).path("/login/oauth/access_token");
            then.status(200)
                .json_body(json!({ "access_token": "ghu_new", "token_type": "bearer" }));
        });

        let fx = fixture(&server.base_url()).await;
        link_expired_account(&fx, None).await;

        let result = fx.service.user_repositories(fx.owner).await;
        assert!(matches!(result, Err(GitHubError::Api { status: 401, .. })));
        refresh.assert_calls(0);
        assert_eq!(
            fx.service.store.authorization(77).await.unwrap().access_token,
            "ghu_old"
        );
    }

    #[tokio::test]
    async fn test_create_project_integration_without_access() {
        let server = MockServer::start();
        mock_installations(&server, "acme/app");

        let fx = fixture(&server.base_url()).await;
        link_account(&fx).await;

        let result = fx
            .service
            .create_project_integration(fx.owner, fx.project.id, "acme/other")
            .await;
        assert!(matches!(result, Err(GitHubError::NoRepositoryAccess(_))));
    }

    #[tokio::test]
    async fn test_patch_issue_closes_done_task() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PATCH)
                .path("/repos/acme/app/issues/4")
                .header("Authorization", "Bearer inst-token")
                .json_body(json!({
                    "title": "Crash",
                    "body": "",
                    "state": "closed",
                    "assignees": []
                }));
            then.status(200)
                .json_body(json!({ "number": 4, "title": "Crash", "state": "closed" }));
        });

        let fx = fixture(&server.base_url()).await;
        let integration = fx.integrate().await;
        let task = fx.task("Crash").await;
        fx.link(&task, &integration, IntegrationKind::Issue, 4).await;
        let task = fx.service.tracker.change_state(task, false).await.unwrap();

        let issue = fx.service.patch_issue(&task).await.unwrap().unwrap();
        mock.assert();
        assert_eq!(issue.state, "closed");
    }

    #[tokio::test]
    async fn test_unlinked_task_is_not_patched() {
        let fx = fixture("http://127.0.0.1:9").await;
        fx.integrate().await;
        let task = fx.task("Local only").await;

        assert!(fx.service.patch_issue(&task).await.unwrap().is_none());
        assert!(fx.service.patch_pull(&task).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_patch_pull_merges_done_task() {
        let server = MockServer::start();
        let merge = server.mock(|when, then| {
            when.method(PUT).path("/repos/acme/app/pulls/9/merge");
            then.status(200).json_body(json!({ "merged": true }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/repos/acme/app/pulls/9");
            then.status(200).json_body(json!({
                "number": 9,
                "title": "Fix",
                "state": "closed",
                "merged": true,
                "head": { "ref": "fix" }
            }));
        });

        let fx = fixture(&server.base_url()).await;
        let integration = fx.integrate().await;
        let task = fx.task("Fix").await;
        fx.link(&task, &integration, IntegrationKind::PullRequest, 9)
            .await;
        let task = fx.service.tracker.change_state(task, false).await.unwrap();

        let pull = fx.service.patch_pull(&task).await.unwrap().unwrap();
        merge.assert();
        assert!(pull.merged);

        let links = fx.service.task_links(&task).await;
        assert!(links.merged);
        assert_eq!(
            links.pull.as_deref(),
            Some("https://github.com/acme/app/pull/9")
        );
        assert!(links.issue.is_none());
    }

    #[tokio::test]
    async fn test_suspended_installation_is_skipped() {
        let fx = fixture("http://127.0.0.1:9").await;
        fx.integrate().await;
        fx.service
            .store
            .set_suspended(INSTALLATION_ID, true)
            .await
            .unwrap();

        let issues = fx.service.issues(fx.owner, fx.project.id).await.unwrap();
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn test_project_reads_require_membership() {
        let fx = fixture("http://127.0.0.1:9").await;
        fx.integrate().await;

        let result = fx.service.branches(Uuid::new_v4(), fx.project.id).await;
        assert!(matches!(result, Err(GitHubError::Core(Error::NotFound(_)))));
    }

    #[tokio::test]
    async fn test_publish_release() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/repos/acme/app/releases")
                .json_body(json!({
                    "tag_name": "Version-1",
                    "name": "Version 1",
                    "body": "",
                    "target_commitish": "main",
                    "generate_release_notes": true
                }));
            then.status(201).json_body(json!({ "id": 321 }));
        });

        let fx = fixture(&server.base_url()).await;
        fx.integrate().await;
        let release = CreateReleaseRequest {
            name: "Version 1".to_string(),
            description: String::new(),
            deadline: Utc::now(),
        }
        .into_release(fx.project.id)
        .unwrap();

        let id = fx
            .service
            .publish_release(&release, Some("main".to_string()))
            .await
            .unwrap();
        assert_eq!(id, Some(321));
    }

    #[tokio::test]
    async fn test_mirror_comment_creates_then_patches() {
        let server = MockServer::start();
        let create = server.mock(|when, then| {
            when.method(POST)
                .path("/repos/acme/app/issues/4/comments")
                .json_body(json!({ "body": "Looks good" }));
            then.status(201).json_body(json!({ "id": 55, "body": "Looks good" }));
        });
        let patch = server.mock(|when, then| {
            when.method(PATCH)
                .path("/repos/acme/app/issues/comments/55")
                .json_body(json!({ "body": "Looks great" }));
            then.status(200).json_body(json!({ "id": 55, "body": "Looks great" }));
        });

        let fx = fixture(&server.base_url()).await;
        let integration = fx.integrate().await;
        let task = fx.task("Review").await;
        fx.link(&task, &integration, IntegrationKind::Issue, 4).await;

        let tracker = &fx.service.tracker;
        let comment = tracker
            .create_comment(fx.owner, fx.project.id, task.number, "Looks good")
            .await
            .unwrap();
        assert_eq!(
            fx.service.mirror_comment(&task, &comment).await.unwrap(),
            Some(55)
        );
        create.assert();

        let comment = tracker
            .update_comment(fx.owner, fx.project.id, task.number, comment.id, "Looks great")
            .await
            .unwrap();
        assert_eq!(
            fx.service.mirror_comment(&task, &comment).await.unwrap(),
            Some(55)
        );
        patch.assert();

        fx.service.forget_comment(comment.id).await.unwrap();
        assert!(fx.service.store.comment(55).await.is_none());
    }
}
