//! Task repository trait
//!
//! Defines the interface for task storage operations. Lookups never return
//! soft-deleted tasks.

use async_trait::async_trait;
use uuid::Uuid;

use super::model::Task;
use crate::Result;

/// Repository interface for task CRUD operations
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Create a new task
    async fn create(&self, task: Task) -> Result<Task>;

    /// Get a task by its internal ID
    async fn get(&self, id: Uuid) -> Result<Option<Task>>;

    /// Get a task by its number within a project
    async fn get_by_number(&self, project_id: Uuid, number: u64) -> Result<Option<Task>>;

    /// All tasks of a project ordered by number
    async fn list(&self, project_id: Uuid) -> Result<Vec<Task>>;

    /// Tasks across all projects assigned to a user
    async fn find_by_assignee(&self, user_id: Uuid) -> Result<Vec<Task>>;

    /// Tasks sitting in a status column
    async fn find_by_status(&self, status_id: Uuid) -> Result<Vec<Task>>;

    /// Tasks currently in a sprint
    async fn find_by_sprint(&self, sprint_id: Uuid) -> Result<Vec<Task>>;

    /// Tasks attached to a release
    async fn find_by_release(&self, release_id: Uuid) -> Result<Vec<Task>>;

    /// Direct children of a task
    async fn find_children(&self, project_id: Uuid, parent_number: u64) -> Result<Vec<Task>>;

    /// Replace an existing task
    async fn update(&self, task: Task) -> Result<Task>;

    /// Mark a task deleted; returns false if it was not found
    async fn soft_delete(&self, id: Uuid) -> Result<bool>;
}
