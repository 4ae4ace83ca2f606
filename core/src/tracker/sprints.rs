use uuid::Uuid;

use crate::error::Error;
use crate::sprint::{CreateSprintRequest, Sprint, SprintStatus, UpdateSprintRequest};
use crate::Result;

use super::Tracker;

impl Tracker {
    pub async fn list_sprints(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        status: Option<SprintStatus>,
    ) -> Result<Vec<Sprint>> {
        self.require_member(user_id, project_id).await?;
        Ok(self.sprints.list(project_id, status).await)
    }

    pub async fn create_sprint(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        request: CreateSprintRequest,
    ) -> Result<Sprint> {
        self.require_member(user_id, project_id).await?;
        self.sprints.insert(request.into_sprint(project_id)?).await
    }

    pub async fn get_sprint(&self, user_id: Uuid, project_id: Uuid, id: Uuid) -> Result<Sprint> {
        self.require_member(user_id, project_id).await?;
        self.sprints
            .get(project_id, id)
            .await
            .ok_or_else(|| Error::not_found("Sprint", id))
    }

    /// Apply a partial update; closing the sprint archives its tasks.
    pub async fn update_sprint(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        id: Uuid,
        request: UpdateSprintRequest,
    ) -> Result<Sprint> {
        let before = self.get_sprint(user_id, project_id, id).await?;
        let sprint = self
            .sprints
            .update(project_id, id, |sprint| request.apply(sprint))
            .await?;

        if sprint.is_closed() && !before.is_closed() {
            let mut archived = 0usize;
            for mut task in self.tasks.find_by_sprint(id).await? {
                task.sprint_id = None;
                if !task.archive_sprint_ids.contains(&id) {
                    task.archive_sprint_ids.push(id);
                }
                self.tasks.update(task).await?;
                archived += 1;
            }
            tracing::info!(sprint_id = %id, archived, "sprint closed");
        }
        Ok(sprint)
    }

    /// Soft delete; tasks currently in the sprint return to the backlog
    pub async fn delete_sprint(&self, user_id: Uuid, project_id: Uuid, id: Uuid) -> Result<()> {
        self.get_sprint(user_id, project_id, id).await?;
        for mut task in self.tasks.find_by_sprint(id).await? {
            task.sprint_id = None;
            self.tasks.update(task).await?;
        }
        self.sprints.soft_delete(project_id, id).await?;
        Ok(())
    }
}
