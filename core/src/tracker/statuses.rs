use uuid::Uuid;

use crate::error::Error;
use crate::status::{CreateStatusRequest, Status, UpdateStatusRequest};
use crate::Result;

use super::Tracker;

impl Tracker {
    pub async fn list_statuses(&self, user_id: Uuid, project_id: Uuid) -> Result<Vec<Status>> {
        self.require_member(user_id, project_id).await?;
        Ok(self.statuses.list(project_id).await)
    }

    pub async fn create_status(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        request: CreateStatusRequest,
    ) -> Result<Status> {
        self.require_member(user_id, project_id).await?;
        self.statuses.insert(request.into_status(project_id)?).await
    }

    pub async fn get_status(&self, user_id: Uuid, project_id: Uuid, id: Uuid) -> Result<Status> {
        self.require_member(user_id, project_id).await?;
        self.statuses
            .get(project_id, id)
            .await
            .ok_or_else(|| Error::not_found("Status", id))
    }

    pub async fn update_status(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        id: Uuid,
        request: UpdateStatusRequest,
    ) -> Result<Status> {
        self.require_member(user_id, project_id).await?;
        self.statuses.update(project_id, id, request).await
    }

    /// Delete a status no live task uses
    pub async fn delete_status(&self, user_id: Uuid, project_id: Uuid, id: Uuid) -> Result<()> {
        self.get_status(user_id, project_id, id).await?;
        if !self.tasks.find_by_status(id).await?.is_empty() {
            return Err(Error::Conflict("status is used by tasks".to_string()));
        }
        self.statuses.delete(id).await?;
        Ok(())
    }
}
