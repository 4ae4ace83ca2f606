//! Task comments

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::storage::{Entity, JsonCollection};
use crate::validation;
use crate::Result;

pub const CONTENT_MAX: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(task_id: Uuid, user_id: Uuid, content: &str) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            task_id,
            user_id,
            content: normalize_content(content)?,
            created_at: Utc::now(),
        })
    }
}

impl Entity for Comment {
    type Key = Uuid;
    const NAME: &'static str = "Comment";

    fn key(&self) -> Uuid {
        self.id
    }
}

pub fn normalize_content(content: &str) -> Result<String> {
    validation::required_text("content", content, CONTENT_MAX)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub content: String,
}

#[derive(Clone)]
pub struct CommentStore {
    comments: JsonCollection<Comment>,
}

impl CommentStore {
    pub async fn new(file_path: PathBuf) -> Result<Self> {
        Ok(Self {
            comments: JsonCollection::open(file_path).await?,
        })
    }

    /// Comments of a task, newest first
    pub async fn list(&self, task_id: Uuid) -> Vec<Comment> {
        let mut comments = self.comments.filter(|c| c.task_id == task_id).await;
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        comments
    }

    pub async fn get(&self, task_id: Uuid, id: Uuid) -> Option<Comment> {
        self.comments.get(id).await.filter(|c| c.task_id == task_id)
    }

    pub async fn by_id(&self, id: Uuid) -> Option<Comment> {
        self.comments.get(id).await
    }

    pub async fn insert(&self, comment: Comment) -> Result<Comment> {
        self.comments.insert(comment).await
    }

    pub async fn set_content(&self, task_id: Uuid, id: Uuid, content: &str) -> Result<Comment> {
        let content = normalize_content(content)?;
        self.comments
            .update(id, |comment| {
                if comment.task_id != task_id {
                    return Err(Error::not_found("Comment", id));
                }
                comment.content = content;
                Ok(comment.clone())
            })
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<Option<Comment>> {
        self.comments.remove(id).await
    }
}
