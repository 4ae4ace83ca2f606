use uuid::Uuid;

use crate::error::Error;
use crate::workspace::{Workspace, WorkspaceSummary};
use crate::Result;

use super::Tracker;

impl Tracker {
    async fn summarize(&self, workspace: &Workspace) -> WorkspaceSummary {
        let mut project_ids = Vec::new();
        for member in self.projects.memberships_for_user(workspace.user_id).await {
            if member.workspace_id == workspace.id
                && self.projects.get(member.project_id).await.is_some()
            {
                project_ids.push(member.project_id);
            }
        }
        project_ids.sort();
        WorkspaceSummary::new(workspace, project_ids)
    }

    pub async fn list_workspaces(&self, user_id: Uuid) -> Vec<WorkspaceSummary> {
        let mut summaries = Vec::new();
        for workspace in self.workspaces.list_for_user(user_id).await {
            summaries.push(self.summarize(&workspace).await);
        }
        summaries
    }

    pub async fn create_workspace(&self, user_id: Uuid, name: &str) -> Result<WorkspaceSummary> {
        let workspace = self.workspaces.create(user_id, name).await?;
        tracing::debug!(user_id = %user_id, workspace_id = workspace.id, "workspace created");
        Ok(WorkspaceSummary::new(&workspace, Vec::new()))
    }

    pub async fn get_workspace(&self, user_id: Uuid, id: u64) -> Result<WorkspaceSummary> {
        let workspace = self
            .workspaces
            .get(user_id, id)
            .await
            .ok_or_else(|| Error::not_found("Workspace", id))?;
        Ok(self.summarize(&workspace).await)
    }

    pub async fn rename_workspace(
        &self,
        user_id: Uuid,
        id: u64,
        name: &str,
    ) -> Result<WorkspaceSummary> {
        let workspace = self.workspaces.rename(user_id, id, name).await?;
        Ok(self.summarize(&workspace).await)
    }

    /// Delete an empty workspace
    pub async fn delete_workspace(&self, user_id: Uuid, id: u64) -> Result<()> {
        if self.workspaces.get(user_id, id).await.is_none() {
            return Err(Error::not_found("Workspace", id));
        }
        if self.projects.workspace_in_use(user_id, id).await {
            return Err(Error::Conflict(
                "workspace must be empty to delete".to_string(),
            ));
        }
        self.workspaces.delete(user_id, id).await?;
        Ok(())
    }
}
