//! Sprint persistent store

use std::path::PathBuf;

use chrono::Utc;
use uuid::Uuid;

use crate::error::Error;
use crate::storage::JsonCollection;
use crate::Result;

use super::model::{Sprint, SprintStatus};

#[derive(Clone)]
pub struct SprintStore {
    sprints: JsonCollection<Sprint>,
}

impl SprintStore {
    pub async fn new(file_path: PathBuf) -> Result<Self> {
        Ok(Self {
            sprints: JsonCollection::open(file_path).await?,
        })
    }

    /// Live sprints of a project ordered by start date, optionally by status
    pub async fn list(&self, project_id: Uuid, status: Option<SprintStatus>) -> Vec<Sprint> {
        let mut sprints = self
            .sprints
            .filter(|s| {
                s.project_id == project_id
                    && !s.is_deleted()
                    && status.map_or(true, |status| s.status == status)
            })
            .await;
        sprints.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.name.cmp(&b.name)));
        sprints
    }

    pub async fn get(&self, project_id: Uuid, id: Uuid) -> Option<Sprint> {
        self.sprints
            .get(id)
            .await
            .filter(|s| s.project_id == project_id && !s.is_deleted())
    }

    pub async fn insert(&self, sprint: Sprint) -> Result<Sprint> {
        self.sprints.insert(sprint).await
    }

    pub async fn update<F>(&self, project_id: Uuid, id: Uuid, apply: F) -> Result<Sprint>
    where
        F: FnOnce(&mut Sprint) -> Result<()>,
    {
        self.sprints
            .update(id, |sprint| {
                if sprint.project_id != project_id || sprint.is_deleted() {
                    return Err(Error::not_found("Sprint", id));
                }
                apply(sprint)?;
                Ok(sprint.clone())
            })
            .await
    }

    pub async fn soft_delete(&self, project_id: Uuid, id: Uuid) -> Result<Sprint> {
        self.update(project_id, id, |sprint| {
            sprint.deleted_at = Some(Utc::now());
            Ok(())
        })
        .await
    }
}
