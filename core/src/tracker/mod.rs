//! Membership-aware facade over the domain stores
//!
//! Every user-facing operation resolves the caller's membership first; a
//! project the caller does not belong to is reported as not found. The
//! `sync` half serves integrations and skips the membership check.

mod comments;
mod events;
mod meetings;
mod projects;
mod releases;
mod sprints;
mod statuses;
mod sync;
mod tasks;
mod time_tracks;
mod workspaces;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::comment::CommentStore;
use crate::error::Error;
use crate::meeting::MeetingStore;
use crate::project::{Project, ProjectMember, ProjectStore};
use crate::release::ReleaseStore;
use crate::sprint::SprintStore;
use crate::status::StatusStore;
use crate::task::{FileTaskStore, Task, TaskRepository};
use crate::time_track::TimeTrackStore;
use crate::workspace::WorkspaceStore;
use crate::Result;

pub use projects::ProjectDetails;

pub struct Tracker {
    data_dir: PathBuf,
    workspaces: WorkspaceStore,
    projects: ProjectStore,
    statuses: StatusStore,
    tasks: Arc<dyn TaskRepository>,
    sprints: SprintStore,
    releases: ReleaseStore,
    meetings: MeetingStore,
    comments: CommentStore,
    time_tracks: TimeTrackStore,
}

impl Tracker {
    /// Open every store under `data_dir`
    pub async fn open(data_dir: &Path) -> Result<Self> {
        let tasks = FileTaskStore::new(data_dir.join("tasks.json")).await?;
        Self::with_task_repository(data_dir, Arc::new(tasks)).await
    }

    pub async fn with_task_repository(
        data_dir: &Path,
        tasks: Arc<dyn TaskRepository>,
    ) -> Result<Self> {
        let tracker = Self {
            data_dir: data_dir.to_path_buf(),
            workspaces: WorkspaceStore::new(data_dir.join("workspaces.json")).await?,
            projects: ProjectStore::new(data_dir).await?,
            statuses: StatusStore::new(data_dir.join("statuses.json")).await?,
            tasks,
            sprints: SprintStore::new(data_dir.join("sprints.json")).await?,
            releases: ReleaseStore::new(data_dir.join("releases.json")).await?,
            meetings: MeetingStore::new(data_dir.join("meetings.json")).await?,
            comments: CommentStore::new(data_dir.join("comments.json")).await?,
            time_tracks: TimeTrackStore::new(data_dir.join("time_tracks.json")).await?,
        };
        tracing::info!(data_dir = %data_dir.display(), "tracker opened");
        Ok(tracker)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Resolve a live project together with the caller's membership
    async fn membership(&self, user_id: Uuid, project_id: Uuid) -> Result<(Project, ProjectMember)> {
        let project = self
            .projects
            .get(project_id)
            .await
            .ok_or_else(|| Error::not_found("Project", project_id))?;
        let member = self
            .projects
            .member(project_id, user_id)
            .await
            .ok_or_else(|| Error::not_found("Project", project_id))?;
        Ok((project, member))
    }

    async fn require_member(&self, user_id: Uuid, project_id: Uuid) -> Result<Project> {
        Ok(self.membership(user_id, project_id).await?.0)
    }

    async fn task_in(&self, project_id: Uuid, number: u64) -> Result<Task> {
        self.tasks
            .get_by_number(project_id, number)
            .await?
            .ok_or_else(|| Error::not_found("Task", number))
    }

    pub async fn is_member(&self, user_id: Uuid, project_id: Uuid) -> bool {
        self.membership(user_id, project_id).await.is_ok()
    }
}
