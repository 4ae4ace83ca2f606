//! Project persistent store
//!
//! Keeps projects and their memberships in two files.

use std::path::Path;

use chrono::Utc;
use uuid::Uuid;

use crate::error::Error;
use crate::storage::JsonCollection;
use crate::Result;

use super::model::{Project, ProjectMember};

/// Thread-safe project store with file persistence
#[derive(Clone)]
pub struct ProjectStore {
    projects: JsonCollection<Project>,
    members: JsonCollection<ProjectMember>,
}

impl ProjectStore {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        Ok(Self {
            projects: JsonCollection::open(data_dir.join("projects.json")).await?,
            members: JsonCollection::open(data_dir.join("project_members.json")).await?,
        })
    }

    pub async fn insert(&self, project: Project) -> Result<Project> {
        self.projects.insert(project).await
    }

    /// Get a project that has not been deleted
    pub async fn get(&self, id: Uuid) -> Option<Project> {
        self.projects.get(id).await.filter(|p| !p.is_deleted())
    }

    pub async fn list(&self) -> Vec<Project> {
        self.projects.filter(|p| !p.is_deleted()).await
    }

    pub async fn update<F>(&self, id: Uuid, apply: F) -> Result<Project>
    where
        F: FnOnce(&mut Project) -> Result<()>,
    {
        self.projects
            .update(id, |project| {
                if project.is_deleted() {
                    return Err(Error::not_found("Project", id));
                }
                apply(project)?;
                project.updated_at = Utc::now();
                Ok(project.clone())
            })
            .await
    }

    /// Allocate the next task number of a project
    pub async fn next_task_number(&self, id: Uuid) -> Result<u64> {
        self.projects
            .update(id, |project| {
                project.task_counter += 1;
                Ok(project.task_counter)
            })
            .await
    }

    pub async fn soft_delete(&self, id: Uuid) -> Result<Project> {
        self.update(id, |project| {
            project.deleted_at = Some(Utc::now());
            Ok(())
        })
        .await
    }

    pub async fn add_member(&self, member: ProjectMember) -> Result<ProjectMember> {
        self.members.insert(member).await
    }

    pub async fn member(&self, project_id: Uuid, user_id: Uuid) -> Option<ProjectMember> {
        self.members.get((project_id, user_id)).await
    }

    pub async fn members(&self, project_id: Uuid) -> Vec<ProjectMember> {
        self.members.filter(|m| m.project_id == project_id).await
    }

    pub async fn memberships_for_user(&self, user_id: Uuid) -> Vec<ProjectMember> {
        self.members.filter(|m| m.user_id == user_id).await
    }

    pub async fn workspace_in_use(&self, user_id: Uuid, workspace_id: u64) -> bool {
        self.members
            .any(|m| m.user_id == user_id && m.workspace_id == workspace_id)
            .await
    }

    pub async fn move_member(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        workspace_id: u64,
    ) -> Result<ProjectMember> {
        self.members
            .update((project_id, user_id), |member| {
                member.workspace_id = workspace_id;
                Ok(member.clone())
            })
            .await
    }

    pub async fn remove_member(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectMember>> {
        self.members.remove((project_id, user_id)).await
    }

    pub async fn remove_memberships_for_user(&self, user_id: Uuid) -> Result<Vec<ProjectMember>> {
        self.members.remove_where(|m| m.user_id == user_id).await
    }
}
