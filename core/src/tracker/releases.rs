use uuid::Uuid;

use crate::error::Error;
use crate::release::{CreateReleaseRequest, Release, UpdateReleaseRequest};
use crate::Result;

use super::Tracker;

impl Tracker {
    pub async fn list_releases(&self, user_id: Uuid, project_id: Uuid) -> Result<Vec<Release>> {
        self.require_member(user_id, project_id).await?;
        Ok(self.releases.list(project_id).await)
    }

    pub async fn create_release(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        request: CreateReleaseRequest,
    ) -> Result<Release> {
        self.require_member(user_id, project_id).await?;
        self.releases.insert(request.into_release(project_id)?).await
    }

    pub async fn get_release(&self, user_id: Uuid, project_id: Uuid, id: Uuid) -> Result<Release> {
        self.require_member(user_id, project_id).await?;
        self.releases
            .get(project_id, id)
            .await
            .ok_or_else(|| Error::not_found("Release", id))
    }

    pub async fn update_release(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        id: Uuid,
        request: UpdateReleaseRequest,
    ) -> Result<Release> {
        self.require_member(user_id, project_id).await?;
        self.releases
            .update(project_id, id, |release| request.apply(release))
            .await
    }

    /// Delete an unpublished release and detach its tasks
    pub async fn delete_release(&self, user_id: Uuid, project_id: Uuid, id: Uuid) -> Result<()> {
        let release = self.get_release(user_id, project_id, id).await?;
        release.ensure_unreleased()?;
        for mut task in self.tasks.find_by_release(id).await? {
            task.release_id = None;
            self.tasks.update(task).await?;
        }
        self.releases.delete(id).await?;
        Ok(())
    }

    /// Check that a release can be published: it is not yet released and
    /// every attached task sits in a final status.
    pub async fn release_ready(&self, user_id: Uuid, project_id: Uuid, id: Uuid) -> Result<Release> {
        let release = self.get_release(user_id, project_id, id).await?;
        release.ensure_unreleased()?;
        for task in self.tasks.find_by_release(id).await? {
            if !self.is_done(&task).await {
                return Err(Error::Conflict("Release contains tasks not done".to_string()));
            }
        }
        Ok(release)
    }

    pub async fn mark_released(
        &self,
        project_id: Uuid,
        id: Uuid,
        git_release_id: Option<u64>,
    ) -> Result<Release> {
        let release = self
            .releases
            .update(project_id, id, |release| {
                release.ensure_unreleased()?;
                release.released = true;
                release.git_release_id = git_release_id;
                Ok(())
            })
            .await?;
        tracing::info!(release_id = %id, git_release_id = ?git_release_id, "release published");
        Ok(release)
    }
}
