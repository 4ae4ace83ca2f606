use uuid::Uuid;

use crate::comment::Comment;
use crate::error::Error;
use crate::Result;

use super::Tracker;

impl Tracker {
    pub async fn list_comments(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        number: u64,
    ) -> Result<Vec<Comment>> {
        let task = self.get_task(user_id, project_id, number).await?;
        Ok(self.comments.list(task.id).await)
    }

    pub async fn create_comment(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        number: u64,
        content: &str,
    ) -> Result<Comment> {
        let task = self.get_task(user_id, project_id, number).await?;
        self.comments
            .insert(Comment::new(task.id, user_id, content)?)
            .await
    }

    pub async fn get_comment(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        number: u64,
        id: Uuid,
    ) -> Result<Comment> {
        let task = self.get_task(user_id, project_id, number).await?;
        self.comments
            .get(task.id, id)
            .await
            .ok_or_else(|| Error::not_found("Comment", id))
    }

    async fn own_comment(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        number: u64,
        id: Uuid,
    ) -> Result<Comment> {
        let comment = self.get_comment(user_id, project_id, number, id).await?;
        if comment.user_id != user_id {
            return Err(Error::Forbidden(
                "only the author can change a comment".to_string(),
            ));
        }
        Ok(comment)
    }

    pub async fn update_comment(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        number: u64,
        id: Uuid,
        content: &str,
    ) -> Result<Comment> {
        let comment = self.own_comment(user_id, project_id, number, id).await?;
        self.comments.set_content(comment.task_id, id, content).await
    }

    pub async fn delete_comment(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        number: u64,
        id: Uuid,
    ) -> Result<Comment> {
        let comment = self.own_comment(user_id, project_id, number, id).await?;
        self.comments.delete(id).await?;
        Ok(comment)
    }
}
