//! Operations driven by git hosting webhooks; no caller membership applies

use uuid::Uuid;

use crate::comment::Comment;
use crate::error::Error;
use crate::task::{Task, SYSTEM_USER_ID};
use crate::validation::{DESCRIPTION_MAX, NAME_MAX};
use crate::Result;

use super::Tracker;

fn clip(value: &str, max: usize) -> String {
    value.trim().chars().take(max).collect()
}

/// Titles from external services may be blank or overlong
fn task_name(value: &str) -> String {
    let name = clip(value, NAME_MAX);
    if name.trim().is_empty() {
        "Untitled".to_string()
    } else {
        name.trim().to_string()
    }
}

impl Tracker {
    pub async fn task_by_id(&self, id: Uuid) -> Result<Option<Task>> {
        self.tasks.get(id).await
    }

    pub async fn task_by_number(&self, project_id: Uuid, number: u64) -> Result<Option<Task>> {
        self.tasks.get_by_number(project_id, number).await
    }

    async fn live_task(&self, id: Uuid) -> Result<Task> {
        self.tasks
            .get(id)
            .await?
            .ok_or_else(|| Error::not_found("Task", id))
    }

    /// Create an open task authored by the system user in the project's
    /// first status column
    pub async fn sync_create_task(
        &self,
        project_id: Uuid,
        name: &str,
        description: &str,
    ) -> Result<Task> {
        if self.projects.get(project_id).await.is_none() {
            return Err(Error::not_found("Project", project_id));
        }
        let status = self
            .statuses
            .list(project_id)
            .await
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidInput("project has no statuses".to_string()))?;

        let number = self.projects.next_task_number(project_id).await?;
        let task = Task::new(project_id, number, task_name(name), status.id, SYSTEM_USER_ID)
            .with_description(clip(description, DESCRIPTION_MAX));
        let task = self.tasks.create(task).await?;
        tracing::debug!(project_id = %project_id, number, "task created from integration");
        self.change_state(task, true).await
    }

    pub async fn sync_edit_task(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Task> {
        let mut task = self.live_task(id).await?;
        if let Some(name) = name {
            task.name = task_name(name);
        }
        if let Some(description) = description {
            task.description = clip(description, DESCRIPTION_MAX);
        }
        self.tasks.update(task).await
    }

    pub async fn set_task_open(&self, id: Uuid, open: bool) -> Result<Task> {
        let task = self.live_task(id).await?;
        self.change_state(task, open).await
    }

    pub async fn sync_delete_task(&self, id: Uuid) -> Result<Option<Task>> {
        match self.tasks.get(id).await? {
            Some(task) => Ok(Some(self.remove_task(task).await?)),
            None => Ok(None),
        }
    }

    /// Set or clear the assignee; users outside the project are ignored
    pub async fn sync_set_assignee(&self, id: Uuid, assignee: Option<Uuid>) -> Result<Task> {
        let mut task = self.live_task(id).await?;
        if let Some(user_id) = assignee {
            if self.projects.member(task.project_id, user_id).await.is_none() {
                tracing::debug!(task_id = %id, user_id = %user_id, "assignee is not a project member");
                return Ok(task);
            }
        }
        task.assignee_id = assignee;
        self.tasks.update(task).await
    }

    pub async fn comment_by_id(&self, id: Uuid) -> Option<Comment> {
        self.comments.by_id(id).await
    }

    pub async fn sync_add_comment(&self, task_id: Uuid, content: &str) -> Result<Comment> {
        let task = self.live_task(task_id).await?;
        let content = clip(content, crate::comment::CONTENT_MAX);
        self.comments
            .insert(Comment::new(task.id, SYSTEM_USER_ID, &content)?)
            .await
    }

    pub async fn sync_edit_comment(&self, id: Uuid, content: &str) -> Result<Comment> {
        let comment = self
            .comments
            .by_id(id)
            .await
            .ok_or_else(|| Error::not_found("Comment", id))?;
        let content = clip(content, crate::comment::CONTENT_MAX);
        self.comments.set_content(comment.task_id, id, &content).await
    }

    pub async fn sync_delete_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        self.comments.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::test_support::fixture;

    #[tokio::test]
    async fn test_sync_created_task_is_open_and_system_authored() {
        let fx = fixture().await;
        let title = "t".repeat(80);
        let task = fx
            .tracker
            .sync_create_task(fx.project.id, &title, "from issue")
            .await
            .unwrap();
        assert_eq!(task.created_by, SYSTEM_USER_ID);
        assert_eq!(task.name.chars().count(), NAME_MAX);
        assert!(!fx.tracker.is_done(&task).await);

        let closed = fx.tracker.set_task_open(task.id, false).await.unwrap();
        assert!(fx.tracker.is_done(&closed).await);
    }

    #[tokio::test]
    async fn test_sync_assignee_ignores_outsiders() {
        let fx = fixture().await;
        let task = fx
            .tracker
            .sync_create_task(fx.project.id, "Issue", "")
            .await
            .unwrap();

        let unchanged = fx
            .tracker
            .sync_set_assignee(task.id, Some(Uuid::new_v4()))
            .await
            .unwrap();
        assert_eq!(unchanged.assignee_id, None);

        let assigned = fx
            .tracker
            .sync_set_assignee(task.id, Some(fx.owner))
            .await
            .unwrap();
        assert_eq!(assigned.assignee_id, Some(fx.owner));

        let cleared = fx.tracker.sync_set_assignee(task.id, None).await.unwrap();
        assert_eq!(cleared.assignee_id, None);
    }

    #[tokio::test]
    async fn test_sync_comments_and_delete() {
        let fx = fixture().await;
        let task = fx
            .tracker
            .sync_create_task(fx.project.id, "Issue", "")
            .await
            .unwrap();

        let comment = fx.tracker.sync_add_comment(task.id, "hello").await.unwrap();
        assert_eq!(comment.user_id, SYSTEM_USER_ID);
        let edited = fx
            .tracker
            .sync_edit_comment(comment.id, "hello again")
            .await
            .unwrap();
        assert_eq!(edited.content, "hello again");
        assert!(fx
            .tracker
            .sync_delete_comment(comment.id)
            .await
            .unwrap()
            .is_some());

        assert!(fx.tracker.sync_delete_task(task.id).await.unwrap().is_some());
        assert!(fx.tracker.task_by_id(task.id).await.unwrap().is_none());
        assert!(fx.tracker.sync_delete_task(task.id).await.unwrap().is_none());
    }
}
