use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::event::{Event, EventFilter};
use crate::Result;

use super::Tracker;

impl Tracker {
    /// Events of one project. With `attendee` set, meetings are limited to
    /// those the user takes part in and tasks to those assigned to them.
    async fn collect_events(
        &self,
        project_id: Uuid,
        attendee: Option<Uuid>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        filter: &EventFilter,
    ) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        if filter.show_meetings() {
            events.extend(
                self.meetings
                    .list(project_id)
                    .await
                    .iter()
                    .filter(|m| attendee.map_or(true, |user| m.participant_ids.contains(&user)))
                    .map(Event::from_meeting),
            );
        }
        if filter.show_sprints() {
            events.extend(
                self.sprints
                    .list(project_id, None)
                    .await
                    .iter()
                    .map(Event::from_sprint),
            );
        }
        if filter.show_releases() {
            events.extend(self.releases.list(project_id).await.iter().map(Event::from_release));
        }
        if filter.show_tasks() {
            for task in self.tasks.list(project_id).await? {
                if attendee.is_some_and(|user| task.assignee_id != Some(user)) {
                    continue;
                }
                if !filter.show_ended && self.is_done(&task).await {
                    continue;
                }
                events.extend(Event::from_task(&task));
            }
        }
        events.retain(|e| e.overlaps(from, to));
        Ok(events)
    }

    pub async fn project_events(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        filter: &EventFilter,
    ) -> Result<Vec<Event>> {
        self.require_member(user_id, project_id).await?;
        let mut events = self.collect_events(project_id, None, from, to, filter).await?;
        events.sort();
        Ok(events)
    }

    /// The caller's calendar: sprints and releases of every project they
    /// belong to, meetings they attend and tasks assigned to them
    pub async fn user_events(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        filter: &EventFilter,
    ) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        for project in self.list_projects(user_id).await {
            let project_id = project.project.id;
            events.extend(
                self.collect_events(project_id, Some(user_id), from, to, filter)
                    .await?,
            );
        }
        events.sort();
        Ok(events)
    }
}
