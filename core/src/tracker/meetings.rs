use uuid::Uuid;

use crate::error::Error;
use crate::meeting::{CreateMeetingRequest, Meeting, UpdateMeetingRequest};
use crate::Result;

use super::Tracker;

impl Tracker {
    /// Keep only participants that belong to the project, without repeats
    async fn project_participants(&self, project_id: Uuid, ids: &[Uuid]) -> Vec<Uuid> {
        let mut participants = Vec::new();
        for &id in ids {
            if !participants.contains(&id) && self.projects.member(project_id, id).await.is_some() {
                participants.push(id);
            }
        }
        participants
    }

    pub async fn list_meetings(&self, user_id: Uuid, project_id: Uuid) -> Result<Vec<Meeting>> {
        self.require_member(user_id, project_id).await?;
        Ok(self.meetings.list(project_id).await)
    }

    pub async fn create_meeting(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        mut request: CreateMeetingRequest,
    ) -> Result<Meeting> {
        self.require_member(user_id, project_id).await?;
        request.participant_ids = self
            .project_participants(project_id, &request.participant_ids)
            .await;
        self.meetings.insert(request.into_meeting(project_id)?).await
    }

    pub async fn get_meeting(&self, user_id: Uuid, project_id: Uuid, id: Uuid) -> Result<Meeting> {
        self.require_member(user_id, project_id).await?;
        self.meetings
            .get(project_id, id)
            .await
            .ok_or_else(|| Error::not_found("Meeting", id))
    }

    pub async fn update_meeting(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        id: Uuid,
        mut request: UpdateMeetingRequest,
    ) -> Result<Meeting> {
        self.require_member(user_id, project_id).await?;
        if let Some(ids) = request.participant_ids.take() {
            request.participant_ids = Some(self.project_participants(project_id, &ids).await);
        }
        self.meetings
            .update(project_id, id, |meeting| request.apply(meeting))
            .await
    }

    pub async fn delete_meeting(&self, user_id: Uuid, project_id: Uuid, id: Uuid) -> Result<()> {
        self.get_meeting(user_id, project_id, id).await?;
        self.meetings.delete(id).await?;
        Ok(())
    }
}
