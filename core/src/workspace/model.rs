//! Workspace model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::Entity;

/// Workspace id reserved for projects a user was invited to
pub const INBOX_ID: u64 = 0;
pub const INBOX_NAME: &str = "Inbox";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: u64,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    pub fn new(id: u64, user_id: Uuid, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn inbox(user_id: Uuid) -> Self {
        Self::new(INBOX_ID, user_id, INBOX_NAME)
    }

    pub fn is_inbox(&self) -> bool {
        self.id == INBOX_ID
    }
}

impl Entity for Workspace {
    type Key = (Uuid, u64);
    const NAME: &'static str = "Workspace";

    fn key(&self) -> Self::Key {
        (self.user_id, self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkspaceRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkspaceRequest {
    pub name: Option<String>,
}

/// Workspace listing entry with the ids of the projects filed in it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSummary {
    pub id: u64,
    pub name: String,
    pub project_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkspaceSummary {
    pub fn new(workspace: &Workspace, project_ids: Vec<Uuid>) -> Self {
        Self {
            id: workspace.id,
            name: workspace.name.clone(),
            project_ids,
            created_at: workspace.created_at,
            updated_at: workspace.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbox_workspace() {
        let user_id = Uuid::new_v4();
        let inbox = Workspace::inbox(user_id);
        assert!(inbox.is_inbox());
        assert_eq!(inbox.name, "Inbox");
        assert_eq!(inbox.key(), (user_id, 0));
    }

    #[test]
    fn test_workspace_serializes_camel_case() {
        let workspace = Workspace::new(3, Uuid::new_v4(), "Team");
        let value = serde_json::to_value(&workspace).unwrap();
        assert_eq!(value["id"], 3);
        assert!(value["userId"].is_string());
        assert!(value["createdAt"].is_string());
    }
}
