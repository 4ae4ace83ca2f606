//! Time tracking on tasks

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::storage::{Entity, JsonCollection};
use crate::Result;

/// A span of work by one user on one task; `end_date` is empty while running
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTrack {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub project_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    /// Set once the span was entered or changed by hand
    pub edited: bool,
}

impl TimeTrack {
    pub fn start(user_id: Uuid, task_id: Uuid, project_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            task_id,
            project_id,
            start_date: Utc::now(),
            end_date: None,
            edited: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.end_date.is_none()
    }
}

impl Entity for TimeTrack {
    type Key = Uuid;
    const NAME: &'static str = "Time track";

    fn key(&self) -> Uuid {
        self.id
    }
}

fn check_span(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if start > end {
        return Err(Error::InvalidInput("start date after end date".to_string()));
    }
    if end > Utc::now() {
        return Err(Error::InvalidInput("end date in the future".to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimeTrackRequest {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl CreateTimeTrackRequest {
    pub fn into_track(self, user_id: Uuid, task_id: Uuid, project_id: Uuid) -> Result<TimeTrack> {
        check_span(self.start_date, self.end_date)?;
        Ok(TimeTrack {
            id: Uuid::new_v4(),
            user_id,
            task_id,
            project_id,
            start_date: self.start_date,
            end_date: Some(self.end_date),
            edited: true,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTimeTrackRequest {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl UpdateTimeTrackRequest {
    pub fn apply(&self, track: &mut TimeTrack) -> Result<()> {
        let Some(current_end) = track.end_date else {
            return Err(Error::Conflict("cannot edit a running time track".to_string()));
        };
        let start = self.start_date.unwrap_or(track.start_date);
        let end = self.end_date.unwrap_or(current_end);
        check_span(start, end)?;
        track.start_date = start;
        track.end_date = Some(end);
        track.edited = true;
        Ok(())
    }
}

#[derive(Clone)]
pub struct TimeTrackStore {
    tracks: JsonCollection<TimeTrack>,
}

impl TimeTrackStore {
    pub async fn new(file_path: PathBuf) -> Result<Self> {
        Ok(Self {
            tracks: JsonCollection::open(file_path).await?,
        })
    }

    pub async fn get(&self, id: Uuid) -> Option<TimeTrack> {
        self.tracks.get(id).await
    }

    pub async fn running(&self, user_id: Uuid, task_id: Uuid) -> Option<TimeTrack> {
        self.tracks
            .find(|t| t.user_id == user_id && t.task_id == task_id && t.is_running())
            .await
    }

    pub async fn for_project(&self, project_id: Uuid) -> Vec<TimeTrack> {
        sorted(self.tracks.filter(|t| t.project_id == project_id).await)
    }

    pub async fn for_task(&self, task_id: Uuid) -> Vec<TimeTrack> {
        sorted(self.tracks.filter(|t| t.task_id == task_id).await)
    }

    pub async fn for_user(&self, user_id: Uuid) -> Vec<TimeTrack> {
        sorted(self.tracks.filter(|t| t.user_id == user_id).await)
    }

    pub async fn insert(&self, track: TimeTrack) -> Result<TimeTrack> {
        self.tracks.insert(track).await
    }

    /// Open a running track unless the user already has one on the task
    pub async fn start(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        project_id: Uuid,
    ) -> Result<TimeTrack> {
        self.tracks
            .insert_with(|tracks| {
                if tracks
                    .values()
                    .any(|t| t.user_id == user_id && t.task_id == task_id && t.is_running())
                {
                    return Err(Error::Conflict("Already tracking".to_string()));
                }
                Ok(TimeTrack::start(user_id, task_id, project_id))
            })
            .await
    }

    pub async fn update<F>(&self, id: Uuid, apply: F) -> Result<TimeTrack>
    where
        F: FnOnce(&mut TimeTrack) -> Result<()>,
    {
        self.tracks
            .update(id, |track| {
                apply(track)?;
                Ok(track.clone())
            })
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<Option<TimeTrack>> {
        self.tracks.remove(id).await
    }
}

fn sorted(mut tracks: Vec<TimeTrack>) -> Vec<TimeTrack> {
    tracks.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
    tracks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_manual_track_validation() {
        let now = Utc::now();
        let ok = CreateTimeTrackRequest {
            start_date: now - Duration::hours(2),
            end_date: now - Duration::hours(1),
        }
        .into_track(Uuid::nil(), Uuid::nil(), Uuid::nil())
        .unwrap();
        assert!(ok.edited);

        let future = CreateTimeTrackRequest {
            start_date: now,
            end_date: now + Duration::hours(1),
        };
        assert!(future.into_track(Uuid::nil(), Uuid::nil(), Uuid::nil()).is_err());

        let reversed = CreateTimeTrackRequest {
            start_date: now - Duration::hours(1),
            end_date: now - Duration::hours(2),
        };
        assert!(reversed.into_track(Uuid::nil(), Uuid::nil(), Uuid::nil()).is_err());
    }

    #[test]
    fn test_running_track_cannot_be_edited() {
        let mut track = TimeTrack::start(Uuid::nil(), Uuid::nil(), Uuid::nil());
        let err = UpdateTimeTrackRequest::default().apply(&mut track).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        track.end_date = Some(Utc::now());
        UpdateTimeTrackRequest {
            start_date: Some(track.start_date - Duration::minutes(30)),
            end_date: None,
        }
        .apply(&mut track)
        .unwrap();
        assert!(track.edited);
    }

    #[tokio::test]
    async fn test_running_lookup() {
        let dir = tempdir().unwrap();
        let store = TimeTrackStore::new(dir.path().join("time_tracks.json")).await.unwrap();
        let user = Uuid::new_v4();
        let task = Uuid::new_v4();

        let track = store.insert(TimeTrack::start(user, task, Uuid::nil())).await.unwrap();
        assert_eq!(store.running(user, task).await.unwrap().id, track.id);

        store
            .update(track.id, |t| {
                t.end_date = Some(Utc::now());
                Ok(())
            })
            .await
            .unwrap();
        assert!(store.running(user, task).await.is_none());
        assert_eq!(store.for_user(user).await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_starts_open_one_track() {
        let dir = tempdir().unwrap();
        let store = TimeTrackStore::new(dir.path().join("time_tracks.json")).await.unwrap();
        let user = Uuid::new_v4();
        let task = Uuid::new_v4();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.start(user, task, Uuid::nil()).await })
            })
            .collect();
        let mut started = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => started += 1,
                Err(err) => assert!(matches!(err, Error::Conflict(_))),
            }
        }
        assert_eq!(started, 1);
        assert_eq!(store.for_task(task).await.len(), 1);

        // Another user may track the same task
        store.start(Uuid::new_v4(), task, Uuid::nil()).await.unwrap();
    }
}
