//! Release model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::storage::Entity;
use crate::validation;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub released: bool,
    /// Id of the release published on the git hosting service
    pub git_release_id: Option<u64>,
    pub created_at: DateTime<Utc>,
}

impl Release {
    pub fn ensure_unreleased(&self) -> Result<()> {
        if self.released {
            return Err(Error::Conflict("release already published".to_string()));
        }
        Ok(())
    }
}

impl Entity for Release {
    type Key = Uuid;
    const NAME: &'static str = "Release";

    fn key(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReleaseRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub deadline: DateTime<Utc>,
}

impl CreateReleaseRequest {
    pub fn into_release(self, project_id: Uuid) -> Result<Release> {
        Ok(Release {
            id: Uuid::new_v4(),
            project_id,
            name: validation::name(&self.name)?,
            description: validation::description(&self.description)?,
            deadline: self.deadline,
            released: false,
            git_release_id: None,
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReleaseRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
}

impl UpdateReleaseRequest {
    pub fn apply(&self, release: &mut Release) -> Result<()> {
        release.ensure_unreleased()?;
        if let Some(name) = &self.name {
            release.name = validation::name(name)?;
        }
        if let Some(description) = &self.description {
            release.description = validation::description(description)?;
        }
        if let Some(deadline) = self.deadline {
            release.deadline = deadline;
        }
        Ok(())
    }
}

/// Query of `PUT .../release/{id}/publish`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReleaseRequest {
    pub branch: Option<String>,
    #[serde(default)]
    pub publish_git_service: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_released_release_rejects_update() {
        let mut release = CreateReleaseRequest {
            name: "1.0".to_string(),
            description: String::new(),
            deadline: Utc::now(),
        }
        .into_release(Uuid::new_v4())
        .unwrap();

        let update = UpdateReleaseRequest {
            name: Some("1.0.1".to_string()),
            ..Default::default()
        };
        update.apply(&mut release).unwrap();
        assert_eq!(release.name, "1.0.1");

        release.released = true;
        let err = update.apply(&mut release).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }
}
