use chrono::Utc;
use uuid::Uuid;

use crate::error::Error;
use crate::time_track::{
    CreateTimeTrackRequest, TimeTrack, UpdateTimeTrackRequest,
};
use crate::Result;

use super::Tracker;

impl Tracker {
    pub async fn start_tracking(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        number: u64,
    ) -> Result<TimeTrack> {
        let task = self.get_task(user_id, project_id, number).await?;
        self.time_tracks.start(user_id, task.id, project_id).await
    }

    pub async fn stop_tracking(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        number: u64,
    ) -> Result<TimeTrack> {
        let task = self.get_task(user_id, project_id, number).await?;
        let running = self
            .time_tracks
            .running(user_id, task.id)
            .await
            .ok_or_else(|| Error::Conflict("Not tracking".to_string()))?;
        self.time_tracks
            .update(running.id, |track| {
                track.end_date = Some(Utc::now());
                Ok(())
            })
            .await
    }

    pub async fn create_time_track(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        number: u64,
        request: CreateTimeTrackRequest,
    ) -> Result<TimeTrack> {
        let task = self.get_task(user_id, project_id, number).await?;
        self.time_tracks
            .insert(request.into_track(user_id, task.id, project_id)?)
            .await
    }

    /// A track of the caller on the given task
    async fn own_track(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        number: u64,
        id: Uuid,
    ) -> Result<TimeTrack> {
        let task = self.get_task(user_id, project_id, number).await?;
        self.time_tracks
            .get(id)
            .await
            .filter(|t| t.task_id == task.id && t.user_id == user_id)
            .ok_or_else(|| Error::not_found("Time track", id))
    }

    pub async fn update_time_track(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        number: u64,
        id: Uuid,
        request: UpdateTimeTrackRequest,
    ) -> Result<TimeTrack> {
        self.own_track(user_id, project_id, number, id).await?;
        self.time_tracks
            .update(id, |track| request.apply(track))
            .await
    }

    pub async fn delete_time_track(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        number: u64,
        id: Uuid,
    ) -> Result<()> {
        self.own_track(user_id, project_id, number, id).await?;
        self.time_tracks.delete(id).await?;
        Ok(())
    }

    pub async fn project_time_tracks(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<Vec<TimeTrack>> {
        self.require_member(user_id, project_id).await?;
        Ok(self.time_tracks.for_project(project_id).await)
    }

    pub async fn task_time_tracks(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        number: u64,
    ) -> Result<Vec<TimeTrack>> {
        let task = self.get_task(user_id, project_id, number).await?;
        Ok(self.time_tracks.for_task(task.id).await)
    }

    pub async fn user_time_tracks(&self, user_id: Uuid) -> Vec<TimeTrack> {
        self.time_tracks.for_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::CreateTaskRequest;
    use crate::tracker::test_support::fixture;
    use chrono::Duration;

    #[tokio::test]
    async fn test_start_stop_cycle() {
        let fx = fixture().await;
        let status = fx.tracker.list_statuses(fx.owner, fx.project.id).await.unwrap()[0].id;
        let task = fx
            .tracker
            .create_task(fx.owner, fx.project.id, CreateTaskRequest::named("Track", status))
            .await
            .unwrap();

        let err = fx
            .tracker
            .stop_tracking(fx.owner, fx.project.id, task.number)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Not tracking"));

        fx.tracker
            .start_tracking(fx.owner, fx.project.id, task.number)
            .await
            .unwrap();
        let err = fx
            .tracker
            .start_tracking(fx.owner, fx.project.id, task.number)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Already tracking"));

        let stopped = fx
            .tracker
            .stop_tracking(fx.owner, fx.project.id, task.number)
            .await
            .unwrap();
        assert!(!stopped.is_running());
        assert_eq!(
            fx.tracker
                .project_time_tracks(fx.owner, fx.project.id)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_tracks_of_others_are_hidden_from_edits() {
        let fx = fixture().await;
        let member = fx.member().await;
        let status = fx.tracker.list_statuses(fx.owner, fx.project.id).await.unwrap()[0].id;
        let task = fx
            .tracker
            .create_task(fx.owner, fx.project.id, CreateTaskRequest::named("Track", status))
            .await
            .unwrap();
        let now = Utc::now();
        let track = fx
            .tracker
            .create_time_track(
                fx.owner,
                fx.project.id,
                task.number,
                CreateTimeTrackRequest {
                    start_date: now - Duration::hours(2),
                    end_date: now - Duration::hours(1),
                },
            )
            .await
            .unwrap();

        let err = fx
            .tracker
            .delete_time_track(member, fx.project.id, task.number, track.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let updated = fx
            .tracker
            .update_time_track(
                fx.owner,
                fx.project.id,
                task.number,
                track.id,
                UpdateTimeTrackRequest {
                    start_date: Some(now - Duration::hours(3)),
                    end_date: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.start_date, now - Duration::hours(3));
        assert_eq!(fx.tracker.user_time_tracks(fx.owner).await.len(), 1);
    }
}
