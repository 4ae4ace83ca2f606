//! Integration records on disk under `<data_dir>/github/`

use std::path::Path;

use uuid::Uuid;
use vernite_core::storage::JsonCollection;
use vernite_core::Result;

use crate::model::{
    Authorization, CommentIntegration, Installation, IntegrationKind, ProjectIntegration,
    TaskIntegration,
};

#[derive(Clone)]
pub struct IntegrationStore {
    authorizations: JsonCollection<Authorization>,
    installations: JsonCollection<Installation>,
    projects: JsonCollection<ProjectIntegration>,
    tasks: JsonCollection<TaskIntegration>,
    comments: JsonCollection<CommentIntegration>,
}

impl IntegrationStore {
    pub async fn open(dir: &Path) -> Result<Self> {
        Ok(Self {
            authorizations: JsonCollection::open(dir.join("authorizations.json")).await?,
            installations: JsonCollection::open(dir.join("installations.json")).await?,
            projects: JsonCollection::open(dir.join("project_integrations.json")).await?,
            tasks: JsonCollection::open(dir.join("task_integrations.json")).await?,
            comments: JsonCollection::open(dir.join("comment_integrations.json")).await?,
        })
    }

    // Authorizations

    pub async fn save_authorization(&self, authorization: Authorization) -> Result<Authorization> {
        self.authorizations.insert(authorization).await
    }

    pub async fn authorization(&self, id: u64) -> Option<Authorization> {
        self.authorizations.get(id).await
    }

    pub async fn authorizations_for_user(&self, user_id: Uuid) -> Vec<Authorization> {
        let mut list = self.authorizations.filter(|a| a.user_id == user_id).await;
        list.sort_by_key(|a| a.id);
        list
    }

    pub async fn remove_authorization(&self, id: u64) -> Result<Option<Authorization>> {
        self.authorizations.remove(id).await
    }

    // Installations

    pub async fn installation(&self, id: u64) -> Option<Installation> {
        self.installations.get(id).await
    }

    pub async fn save_installation(&self, installation: Installation) -> Result<Installation> {
        self.installations.insert(installation).await
    }

    pub async fn set_suspended(&self, id: u64, suspended: bool) -> Result<Installation> {
        self.installations
            .update(id, |installation| {
                installation.suspended = suspended;
                Ok(installation.clone())
            })
            .await
    }

    pub async fn remove_installation(&self, id: u64) -> Result<Option<Installation>> {
        self.installations.remove(id).await
    }

    // Project integrations

    pub async fn save_project(&self, integration: ProjectIntegration) -> Result<ProjectIntegration> {
        self.projects.insert(integration).await
    }

    pub async fn project(&self, project_id: Uuid) -> Option<ProjectIntegration> {
        self.projects.find(|i| i.project_id == project_id).await
    }

    pub async fn project_by_id(&self, id: Uuid) -> Option<ProjectIntegration> {
        self.projects.get(id).await
    }

    pub async fn projects_for_repository(&self, full_name: &str) -> Vec<ProjectIntegration> {
        self.projects.filter(|i| i.is_repository(full_name)).await
    }

    pub async fn projects_for_installation(&self, installation_id: u64) -> Vec<ProjectIntegration> {
        self.projects
            .filter(|i| i.installation_id == installation_id)
            .await
    }

    /// Remove a project integration with every task and comment link under it
    pub async fn remove_project(&self, id: Uuid) -> Result<Option<ProjectIntegration>> {
        let removed = self.projects.remove(id).await?;
        if removed.is_some() {
            self.tasks.remove_where(|t| t.integration_id == id).await?;
            self.comments.remove_where(|c| c.integration_id == id).await?;
        }
        Ok(removed)
    }

    // Task integrations

    pub async fn save_task(&self, integration: TaskIntegration) -> Result<TaskIntegration> {
        self.tasks.insert(integration).await
    }

    pub async fn task(&self, task_id: Uuid, kind: IntegrationKind) -> Option<TaskIntegration> {
        self.tasks.get((task_id, kind)).await
    }

    pub async fn tasks_for_issue(
        &self,
        integration_id: Uuid,
        kind: IntegrationKind,
        issue_id: u64,
    ) -> Vec<TaskIntegration> {
        self.tasks
            .filter(|t| t.integration_id == integration_id && t.kind == kind && t.issue_id == issue_id)
            .await
    }

    pub async fn remove_task(
        &self,
        task_id: Uuid,
        kind: IntegrationKind,
    ) -> Result<Option<TaskIntegration>> {
        self.tasks.remove((task_id, kind)).await
    }

    pub async fn remove_task_links(&self, task_id: Uuid) -> Result<Vec<TaskIntegration>> {
        self.tasks.remove_where(|t| t.task_id == task_id).await
    }

    // Comment integrations

    pub async fn save_comment(&self, integration: CommentIntegration) -> Result<CommentIntegration> {
        self.comments.insert(integration).await
    }

    pub async fn comment(&self, github_comment_id: u64) -> Option<CommentIntegration> {
        self.comments.get(github_comment_id).await
    }

    pub async fn comment_for(&self, comment_id: Uuid) -> Option<CommentIntegration> {
        self.comments.find(|c| c.comment_id == comment_id).await
    }

    pub async fn remove_comment(&self, github_comment_id: u64) -> Result<Option<CommentIntegration>> {
        self.comments.remove(github_comment_id).await
    }

    pub async fn remove_comment_links(&self, comment_id: Uuid) -> Result<Vec<CommentIntegration>> {
        self.comments.remove_where(|c| c.comment_id == comment_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_removing_project_integration_cascades() {
        let dir = tempdir().unwrap();
        let store = IntegrationStore::open(dir.path()).await.unwrap();
        let project_id = Uuid::new_v4();
        let task_id = Uuid::new_v4();

        let integration = store
            .save_project(ProjectIntegration::new(project_id, "acme/app", 1).unwrap())
            .await
            .unwrap();
        store
            .save_task(TaskIntegration::new(
                task_id,
                integration.id,
                IntegrationKind::Issue,
                4,
            ))
            .await
            .unwrap();
        store
            .save_comment(CommentIntegration {
                github_comment_id: 99,
                comment_id: Uuid::new_v4(),
                integration_id: integration.id,
            })
            .await
            .unwrap();

        assert_eq!(store.projects_for_repository("ACME/app").await.len(), 1);

        store.remove_project(integration.id).await.unwrap();
        assert!(store.project(project_id).await.is_none());
        assert!(store.task(task_id, IntegrationKind::Issue).await.is_none());
        assert!(store.comment(99).await.is_none());
    }

    #[tokio::test]
    async fn test_task_links_are_keyed_by_kind() {
        let dir = tempdir().unwrap();
        let store = IntegrationStore::open(dir.path()).await.unwrap();
        let task_id = Uuid::new_v4();
        let integration_id = Uuid::new_v4();

        store
            .save_task(TaskIntegration::new(task_id, integration_id, IntegrationKind::Issue, 1))
            .await
            .unwrap();
        store
            .save_task(TaskIntegration::new(
                task_id,
                integration_id,
                IntegrationKind::PullRequest,
                2,
            ))
            .await
            .unwrap();

        let issues = store
            .tasks_for_issue(integration_id, IntegrationKind::Issue, 1)
            .await;
        assert_eq!(issues.len(), 1);

        let removed = store.remove_task_links(task_id).await.unwrap();
        assert_eq!(removed.len(), 2);

        let reopened = IntegrationStore::open(dir.path()).await.unwrap();
        assert!(reopened.task(task_id, IntegrationKind::PullRequest).await.is_none());
    }
}
