//! Meeting model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::storage::Entity;
use crate::validation;
use crate::Result;

pub const LOCATION_MAX: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: String,
    pub location: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub participant_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Meeting {
    fn check_dates(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(Error::InvalidInput("start date after end date".to_string()));
        }
        Ok(())
    }
}

impl Entity for Meeting {
    type Key = Uuid;
    const NAME: &'static str = "Meeting";

    fn key(&self) -> Uuid {
        self.id
    }
}

fn location(value: Option<&str>) -> Result<Option<String>> {
    match value {
        None => Ok(None),
        Some(value) => {
            let value = validation::bounded_text("location", value, LOCATION_MAX)?;
            Ok((!value.is_empty()).then_some(value))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub location: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub participant_ids: Vec<Uuid>,
}

impl CreateMeetingRequest {
    /// Build the meeting; participants are filtered by the caller.
    pub fn into_meeting(self, project_id: Uuid) -> Result<Meeting> {
        let meeting = Meeting {
            id: Uuid::new_v4(),
            project_id,
            name: validation::name(&self.name)?,
            description: validation::description(&self.description)?,
            location: location(self.location.as_deref())?,
            start_date: self.start_date,
            end_date: self.end_date,
            participant_ids: self.participant_ids,
            created_at: Utc::now(),
        };
        meeting.check_dates()?;
        Ok(meeting)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeetingRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub location: Option<Option<String>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub participant_ids: Option<Vec<Uuid>>,
}

impl UpdateMeetingRequest {
    pub fn apply(&self, meeting: &mut Meeting) -> Result<()> {
        if let Some(name) = &self.name {
            meeting.name = validation::name(name)?;
        }
        if let Some(description) = &self.description {
            meeting.description = validation::description(description)?;
        }
        if let Some(value) = &self.location {
            meeting.location = location(value.as_deref())?;
        }
        if let Some(start_date) = self.start_date {
            meeting.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            meeting.end_date = end_date;
        }
        if let Some(participant_ids) = &self.participant_ids {
            meeting.participant_ids = participant_ids.clone();
        }
        meeting.check_dates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request() -> CreateMeetingRequest {
        let start = Utc::now();
        CreateMeetingRequest {
            name: "Planning".to_string(),
            description: String::new(),
            location: Some("  ".to_string()),
            start_date: start,
            end_date: start + Duration::hours(1),
            participant_ids: Vec::new(),
        }
    }

    #[test]
    fn test_blank_location_is_dropped() {
        let meeting = request().into_meeting(Uuid::new_v4()).unwrap();
        assert_eq!(meeting.location, None);
    }

    #[test]
    fn test_end_before_start_rejected() {
        let mut request = request();
        request.end_date = request.start_date - Duration::minutes(5);
        assert!(request.into_meeting(Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_update_clears_location_with_null() {
        let mut meeting = request().into_meeting(Uuid::new_v4()).unwrap();
        meeting.location = Some("Room 1".to_string());

        let update: UpdateMeetingRequest =
            serde_json::from_value(serde_json::json!({ "location": null })).unwrap();
        update.apply(&mut meeting).unwrap();
        assert_eq!(meeting.location, None);
    }
}
