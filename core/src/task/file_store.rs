//! File-based task storage implementation
//!
//! Stores tasks as JSON in a file on disk.

use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use uuid::Uuid;

use super::model::Task;
use super::repository::TaskRepository;
use crate::storage::JsonCollection;
use crate::{Error, Result};

/// File-based task store using JSON
#[derive(Clone)]
pub struct FileTaskStore {
    tasks: JsonCollection<Task>,
}

impl FileTaskStore {
    /// Create a new FileTaskStore
    ///
    /// If the file doesn't exist, it will be created on first write.
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            tasks: JsonCollection::open(path.into()).await?,
        })
    }

    async fn live<P>(&self, predicate: P) -> Vec<Task>
    where
        P: Fn(&Task) -> bool,
    {
        let mut tasks = self
            .tasks
            .filter(|t| !t.is_deleted() && predicate(t))
            .await;
        tasks.sort_by(|a, b| a.project_id.cmp(&b.project_id).then(a.number.cmp(&b.number)));
        tasks
    }
}

#[async_trait]
impl TaskRepository for FileTaskStore {
    async fn create(&self, task: Task) -> Result<Task> {
        if self.tasks.get(task.id).await.is_some() {
            return Err(Error::InvalidInput(format!(
                "Task with ID {} already exists",
                task.id
            )));
        }
        self.tasks.insert(task).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(self.tasks.get(id).await.filter(|t| !t.is_deleted()))
    }

    async fn get_by_number(&self, project_id: Uuid, number: u64) -> Result<Option<Task>> {
        Ok(self
            .tasks
            .find(|t| t.project_id == project_id && t.number == number && !t.is_deleted())
            .await)
    }

    async fn list(&self, project_id: Uuid) -> Result<Vec<Task>> {
        Ok(self.live(|t| t.project_id == project_id).await)
    }

    async fn find_by_assignee(&self, user_id: Uuid) -> Result<Vec<Task>> {
        Ok(self.live(|t| t.assignee_id == Some(user_id)).await)
    }

    async fn find_by_status(&self, status_id: Uuid) -> Result<Vec<Task>> {
        Ok(self.live(|t| t.status_id == status_id).await)
    }

    async fn find_by_sprint(&self, sprint_id: Uuid) -> Result<Vec<Task>> {
        Ok(self.live(|t| t.sprint_id == Some(sprint_id)).await)
    }

    async fn find_by_release(&self, release_id: Uuid) -> Result<Vec<Task>> {
        Ok(self.live(|t| t.release_id == Some(release_id)).await)
    }

    async fn find_children(&self, project_id: Uuid, parent_number: u64) -> Result<Vec<Task>> {
        Ok(self
            .live(|t| t.project_id == project_id && t.parent_task_id == Some(parent_number))
            .await)
    }

    async fn update(&self, mut task: Task) -> Result<Task> {
        task.last_updated = Utc::now();
        let id = task.id;
        self.tasks
            .update(id, move |stored| {
                if stored.is_deleted() {
                    return Err(Error::not_found("Task", id));
                }
                *stored = task;
                Ok(stored.clone())
            })
            .await
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool> {
        let Some(task) = self.tasks.get(id).await else {
            return Ok(false);
        };
        if task.is_deleted() {
            return Ok(false);
        }
        self.tasks
            .update(id, |stored| {
                stored.deleted_at = Some(Utc::now());
                Ok(())
            })
            .await?;
        Ok(true)
    }
}
