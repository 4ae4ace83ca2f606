//! Sprint model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::storage::Entity;
use crate::validation;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SprintStatus {
    #[default]
    Created,
    Active,
    Closed,
}

impl SprintStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "created" => Some(Self::Created),
            "active" => Some(Self::Active),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub finish_date: DateTime<Utc>,
    pub status: SprintStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Sprint {
    pub fn is_closed(&self) -> bool {
        self.status == SprintStatus::Closed
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    fn check_dates(&self) -> Result<()> {
        if self.start_date > self.finish_date {
            return Err(Error::InvalidInput("start date after finish date".to_string()));
        }
        Ok(())
    }
}

impl Entity for Sprint {
    type Key = Uuid;
    const NAME: &'static str = "Sprint";

    fn key(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSprintRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub finish_date: DateTime<Utc>,
    #[serde(default)]
    pub status: SprintStatus,
}

impl CreateSprintRequest {
    pub fn into_sprint(self, project_id: Uuid) -> Result<Sprint> {
        let sprint = Sprint {
            id: Uuid::new_v4(),
            project_id,
            name: validation::name(&self.name)?,
            description: validation::description(&self.description)?,
            start_date: self.start_date,
            finish_date: self.finish_date,
            status: self.status,
            created_at: Utc::now(),
            deleted_at: None,
        };
        sprint.check_dates()?;
        Ok(sprint)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSprintRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub finish_date: Option<DateTime<Utc>>,
    pub status: Option<SprintStatus>,
}

impl UpdateSprintRequest {
    pub fn apply(&self, sprint: &mut Sprint) -> Result<()> {
        if let Some(name) = &self.name {
            sprint.name = validation::name(name)?;
        }
        if let Some(description) = &self.description {
            sprint.description = validation::description(description)?;
        }
        if let Some(start_date) = self.start_date {
            sprint.start_date = start_date;
        }
        if let Some(finish_date) = self.finish_date {
            sprint.finish_date = finish_date;
        }
        if let Some(status) = self.status {
            sprint.status = status;
        }
        sprint.check_dates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request(start_offset_days: i64) -> CreateSprintRequest {
        let now = Utc::now();
        CreateSprintRequest {
            name: " Sprint 1 ".to_string(),
            description: String::new(),
            start_date: now + Duration::days(start_offset_days),
            finish_date: now + Duration::days(14),
            status: SprintStatus::Created,
        }
    }

    #[test]
    fn test_create_sprint_validates_dates() {
        let sprint = request(0).into_sprint(Uuid::new_v4()).unwrap();
        assert_eq!(sprint.name, "Sprint 1");
        assert!(!sprint.is_closed());

        let err = request(30).into_sprint(Uuid::new_v4()).unwrap_err();
        assert!(err.to_string().contains("start date after finish date"));
    }

    #[test]
    fn test_update_rechecks_dates() {
        let mut sprint = request(0).into_sprint(Uuid::new_v4()).unwrap();
        let update = UpdateSprintRequest {
            finish_date: Some(sprint.start_date - Duration::days(1)),
            ..Default::default()
        };
        assert!(update.apply(&mut sprint).is_err());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(SprintStatus::parse("ACTIVE"), Some(SprintStatus::Active));
        assert_eq!(SprintStatus::parse("done"), None);
    }
}
