//! Meeting persistent store

use std::path::PathBuf;

use uuid::Uuid;

use crate::error::Error;
use crate::storage::JsonCollection;
use crate::Result;

use super::model::Meeting;

#[derive(Clone)]
pub struct MeetingStore {
    meetings: JsonCollection<Meeting>,
}

impl MeetingStore {
    pub async fn new(file_path: PathBuf) -> Result<Self> {
        Ok(Self {
            meetings: JsonCollection::open(file_path).await?,
        })
    }

    /// Meetings of a project ordered by start, end and name
    pub async fn list(&self, project_id: Uuid) -> Vec<Meeting> {
        let mut meetings = self.meetings.filter(|m| m.project_id == project_id).await;
        meetings.sort_by(|a, b| {
            a.start_date
                .cmp(&b.start_date)
                .then(a.end_date.cmp(&b.end_date))
                .then(a.name.cmp(&b.name))
        });
        meetings
    }

    pub async fn get(&self, project_id: Uuid, id: Uuid) -> Option<Meeting> {
        self.meetings
            .get(id)
            .await
            .filter(|m| m.project_id == project_id)
    }

    pub async fn insert(&self, meeting: Meeting) -> Result<Meeting> {
        self.meetings.insert(meeting).await
    }

    pub async fn update<F>(&self, project_id: Uuid, id: Uuid, apply: F) -> Result<Meeting>
    where
        F: FnOnce(&mut Meeting) -> Result<()>,
    {
        self.meetings
            .update(id, |meeting| {
                if meeting.project_id != project_id {
                    return Err(Error::not_found("Meeting", id));
                }
                apply(meeting)?;
                Ok(meeting.clone())
            })
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<Option<Meeting>> {
        self.meetings.remove(id).await
    }

    /// Drop a user from every meeting they were invited to
    pub async fn remove_participant(&self, project_id: Uuid, user_id: Uuid) -> Result<usize> {
        self.meetings
            .update_where(
                |m| m.project_id == project_id && m.participant_ids.contains(&user_id),
                |m| m.participant_ids.retain(|id| *id != user_id),
            )
            .await
    }
}
