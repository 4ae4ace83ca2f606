//! Project model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::Entity;
use crate::validation;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,

    /// Last task number handed out in this project
    #[serde(default)]
    pub task_counter: u64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            task_counter: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl Entity for Project {
    type Key = Uuid;
    const NAME: &'static str = "Project";

    fn key(&self) -> Uuid {
        self.id
    }
}

/// Role a member holds in a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    Owner,
    Member,
}

impl ProjectRole {
    /// Numeric privilege level; lower is stronger
    pub fn privileges(self) -> u8 {
        match self {
            Self::Owner => 1,
            Self::Member => 2,
        }
    }

    pub fn can_manage_members(self) -> bool {
        matches!(self, Self::Owner)
    }
}

/// Membership of a user in a project, filed under one of the user's workspaces
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub workspace_id: u64,
    pub role: ProjectRole,
    pub created_at: DateTime<Utc>,
}

impl ProjectMember {
    pub fn new(project_id: Uuid, user_id: Uuid, workspace_id: u64, role: ProjectRole) -> Self {
        Self {
            project_id,
            user_id,
            workspace_id,
            role,
            created_at: Utc::now(),
        }
    }
}

impl Entity for ProjectMember {
    type Key = (Uuid, Uuid);
    const NAME: &'static str = "Project member";

    fn key(&self) -> Self::Key {
        (self.project_id, self.user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub workspace_id: u64,
}

impl CreateProjectRequest {
    pub fn normalized(&self) -> Result<(String, String)> {
        Ok((
            validation::name(&self.name)?,
            validation::description(&self.description)?,
        ))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub workspace_id: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInviteRequest {
    /// E-mails or usernames of the invitees
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub projects: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_project() {
        let project = Project::new("Vernite", "Planning tool");
        assert_eq!(project.name, "Vernite");
        assert_eq!(project.task_counter, 0);
        assert!(!project.is_deleted());
    }

    #[test]
    fn test_role_privileges() {
        assert_eq!(ProjectRole::Owner.privileges(), 1);
        assert_eq!(ProjectRole::Member.privileges(), 2);
        assert!(ProjectRole::Owner.can_manage_members());
        assert!(!ProjectRole::Member.can_manage_members());
    }

    #[test]
    fn test_create_request_normalization() {
        let request = CreateProjectRequest {
            name: "  Board ".to_string(),
            description: " text ".to_string(),
            workspace_id: 1,
        };
        assert_eq!(
            request.normalized().unwrap(),
            ("Board".to_string(), "text".to_string())
        );

        let empty = CreateProjectRequest {
            name: " ".to_string(),
            description: String::new(),
            workspace_id: 1,
        };
        assert!(empty.normalized().is_err());
    }

    #[test]
    fn test_deleted_at_is_omitted_until_set() {
        let project = Project::new("Board", "");
        let value = serde_json::to_value(&project).unwrap();
        assert!(value.get("deletedAt").is_none());
        assert_eq!(value["taskCounter"], 0);
    }
}
