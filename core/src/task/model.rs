//! Task model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::git::{IssueAction, PullAction};
use crate::storage::Entity;
use crate::validation;
use crate::Result;

/// Author recorded on tasks and comments created by integrations
pub const SYSTEM_USER_ID: Uuid = Uuid::nil();

/// Kind of work item, which also constrains the parent hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    #[default]
    Task,
    UserStory,
    Issue,
    Epic,
    Subtask,
}

impl TaskType {
    /// Whether a task of this type may hang under a parent of type `parent`
    pub fn is_valid_parent(self, parent: TaskType) -> bool {
        if self == parent {
            return false;
        }
        match self {
            Self::Epic => false,
            Self::Task | Self::UserStory => parent == Self::Epic,
            Self::Issue => matches!(parent, Self::Epic | Self::Task),
            Self::Subtask => parent != Self::Epic,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TASK" => Some(Self::Task),
            "USER_STORY" => Some(Self::UserStory),
            "ISSUE" => Some(Self::Issue),
            "EPIC" => Some(Self::Epic),
            "SUBTASK" => Some(Self::Subtask),
            _ => None,
        }
    }
}

/// Task priority level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    #[default]
    Low,
    Medium,
    High,
    Urgent,
}

/// A task on a project board
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    /// Per-project sequence number used in URLs and commit references
    pub number: u64,
    pub project_id: Uuid,
    pub name: String,
    pub description: String,
    pub status_id: Uuid,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub priority: TaskPriority,
    pub assignee_id: Option<Uuid>,
    /// Number of the parent task in the same project
    pub parent_task_id: Option<u64>,
    /// Current non-closed sprint
    pub sprint_id: Option<Uuid>,
    /// Closed sprints the task went through
    #[serde(default)]
    pub archive_sprint_ids: Vec<Uuid>,
    pub release_id: Option<Uuid>,
    pub deadline: Option<DateTime<Utc>>,
    pub estimated_date: Option<DateTime<Utc>>,
    pub story_points: Option<u32>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(
        project_id: Uuid,
        number: u64,
        name: impl Into<String>,
        status_id: Uuid,
        created_by: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            number,
            project_id,
            name: name.into(),
            description: String::new(),
            status_id,
            task_type: TaskType::Task,
            priority: TaskPriority::Low,
            assignee_id: None,
            parent_task_id: None,
            sprint_id: None,
            archive_sprint_ids: Vec::new(),
            release_id: None,
            deadline: None,
            estimated_date: None,
            story_points: None,
            created_by,
            created_at: now,
            last_updated: now,
            deleted_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_parent(mut self, parent_number: u64) -> Self {
        self.parent_task_id = Some(parent_number);
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Check the parent hierarchy against an already resolved parent task
    pub fn check_parent(&self, parent: Option<&Task>) -> Result<()> {
        match parent {
            None if self.task_type == TaskType::Subtask => Err(Error::InvalidInput(
                "subtask must have parent".to_string(),
            )),
            None => Ok(()),
            Some(parent) => {
                if parent.project_id != self.project_id || parent.id == self.id {
                    return Err(Error::InvalidInput("invalid parent task".to_string()));
                }
                if !self.task_type.is_valid_parent(parent.task_type) {
                    return Err(Error::InvalidInput(format!(
                        "task of type {:?} cannot have parent of type {:?}",
                        self.task_type, parent.task_type
                    )));
                }
                Ok(())
            }
        }
    }
}

impl Entity for Task {
    type Key = Uuid;
    const NAME: &'static str = "Task";

    fn key(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status_id: Uuid,
    #[serde(rename = "type", default)]
    pub task_type: TaskType,
    #[serde(default)]
    pub priority: TaskPriority,
    pub assignee_id: Option<Uuid>,
    pub parent_task_id: Option<u64>,
    pub sprint_id: Option<Uuid>,
    pub release_id: Option<Uuid>,
    pub deadline: Option<DateTime<Utc>>,
    pub estimated_date: Option<DateTime<Utc>>,
    pub story_points: Option<u32>,
    pub issue: Option<IssueAction>,
    pub pull: Option<PullAction>,
}

impl CreateTaskRequest {
    /// A plain task request with only the required fields set
    pub fn named(name: impl Into<String>, status_id: Uuid) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            status_id,
            task_type: TaskType::Task,
            priority: TaskPriority::Low,
            assignee_id: None,
            parent_task_id: None,
            sprint_id: None,
            release_id: None,
            deadline: None,
            estimated_date: None,
            story_points: None,
            issue: None,
            pull: None,
        }
    }
}

/// Partial task update. Nullable fields distinguish a missing key (keep)
/// from an explicit `null` (clear).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub task_type: Option<TaskType>,
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub assignee_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub parent_task_id: Option<Option<u64>>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub sprint_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub release_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub deadline: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub estimated_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub story_points: Option<Option<u32>>,
    pub issue: Option<IssueAction>,
    pub pull: Option<PullAction>,
}

/// Task listing filter; empty vectors mean "any"
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub sprint_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub status_ids: Vec<Uuid>,
    pub types: Vec<TaskType>,
    pub parent_id: Option<u64>,
    /// Only tasks outside any active sprint
    pub backlog: bool,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if self.backlog && task.sprint_id.is_some() {
            return false;
        }
        if let Some(sprint_id) = self.sprint_id {
            if task.sprint_id != Some(sprint_id) && !task.archive_sprint_ids.contains(&sprint_id) {
                return false;
            }
        }
        if self.assignee_id.is_some() && task.assignee_id != self.assignee_id {
            return false;
        }
        if !self.status_ids.is_empty() && !self.status_ids.contains(&task.status_id) {
            return false;
        }
        if !self.types.is_empty() && !self.types.contains(&task.task_type) {
            return false;
        }
        if self.parent_id.is_some() && task.parent_task_id != self.parent_id {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(task_type: TaskType) -> Task {
        Task::new(Uuid::nil(), 1, "Task", Uuid::new_v4(), SYSTEM_USER_ID).with_type(task_type)
    }

    #[test]
    fn test_parent_rules() {
        use TaskType as T;

        assert!(!T::Task.is_valid_parent(T::Task));
        assert!(T::Task.is_valid_parent(T::Epic));
        assert!(T::UserStory.is_valid_parent(T::Epic));
        assert!(!T::UserStory.is_valid_parent(T::Task));
        assert!(T::Issue.is_valid_parent(T::Epic));
        assert!(T::Issue.is_valid_parent(T::Task));
        assert!(!T::Issue.is_valid_parent(T::UserStory));
        assert!(!T::Epic.is_valid_parent(T::Task));
        assert!(T::Subtask.is_valid_parent(T::Task));
        assert!(T::Subtask.is_valid_parent(T::Issue));
        assert!(T::Subtask.is_valid_parent(T::UserStory));
        assert!(!T::Subtask.is_valid_parent(T::Epic));
        assert!(!T::Subtask.is_valid_parent(T::Subtask));
    }

    #[test]
    fn test_subtask_requires_parent() {
        let subtask = task(TaskType::Subtask);
        let err = subtask.check_parent(None).unwrap_err();
        assert!(err.to_string().contains("subtask must have parent"));

        let parent = task(TaskType::Task);
        assert!(subtask.check_parent(Some(&parent)).is_ok());

        let epic = task(TaskType::Epic);
        assert!(subtask.check_parent(Some(&epic)).is_err());
    }

    #[test]
    fn test_parent_must_share_project() {
        let child = task(TaskType::Task);
        let mut epic = task(TaskType::Epic);
        epic.project_id = Uuid::new_v4();
        assert!(child.check_parent(Some(&epic)).is_err());
    }

    #[test]
    fn test_update_request_distinguishes_null_from_missing() {
        let request: UpdateTaskRequest = serde_json::from_value(serde_json::json!({
            "assigneeId": null,
            "storyPoints": 5
        }))
        .unwrap();
        assert_eq!(request.assignee_id, Some(None));
        assert_eq!(request.story_points, Some(Some(5)));
        assert_eq!(request.sprint_id, None);
    }

    #[test]
    fn test_filter_matches() {
        let sprint = Uuid::new_v4();
        let mut in_sprint = task(TaskType::Issue);
        in_sprint.sprint_id = Some(sprint);

        let filter = TaskFilter {
            sprint_id: Some(sprint),
            types: vec![TaskType::Issue],
            ..Default::default()
        };
        assert!(filter.matches(&in_sprint));
        assert!(!filter.matches(&task(TaskType::Issue)));

        let backlog = TaskFilter {
            backlog: true,
            ..Default::default()
        };
        assert!(!backlog.matches(&in_sprint));
    }

    #[test]
    fn test_task_type_parse_and_wire_format() {
        assert_eq!(TaskType::parse("user_story"), Some(TaskType::UserStory));
        assert_eq!(TaskType::parse("bogus"), None);
        let value = serde_json::to_value(task(TaskType::UserStory)).unwrap();
        assert_eq!(value["type"], "USER_STORY");
        assert_eq!(value["priority"], "low");
    }
}
