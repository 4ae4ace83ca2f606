//! Calendar events derived from meetings, sprints, releases and task dates

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::meeting::Meeting;
use crate::release::Release;
use crate::sprint::Sprint;
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Meeting,
    Sprint,
    TaskEstimate,
    TaskDeadline,
    Release,
}

impl EventType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "MEETING" => Some(Self::Meeting),
            "SPRINT" => Some(Self::Sprint),
            "TASK_ESTIMATE" => Some(Self::TaskEstimate),
            "TASK_DEADLINE" => Some(Self::TaskDeadline),
            "RELEASE" => Some(Self::Release),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub project_id: Uuid,
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Id of the source record; task number for task events
    pub related_id: String,
    pub name: String,
    pub description: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: DateTime<Utc>,
    pub location: Option<String>,
}

impl Event {
    pub fn from_meeting(meeting: &Meeting) -> Self {
        Self {
            project_id: meeting.project_id,
            event_type: EventType::Meeting,
            related_id: meeting.id.to_string(),
            name: meeting.name.clone(),
            description: meeting.description.clone(),
            start_date: Some(meeting.start_date),
            end_date: meeting.end_date,
            location: meeting.location.clone(),
        }
    }

    pub fn from_sprint(sprint: &Sprint) -> Self {
        Self {
            project_id: sprint.project_id,
            event_type: EventType::Sprint,
            related_id: sprint.id.to_string(),
            name: sprint.name.clone(),
            description: sprint.description.clone(),
            start_date: Some(sprint.start_date),
            end_date: sprint.finish_date,
            location: None,
        }
    }

    pub fn from_release(release: &Release) -> Self {
        Self {
            project_id: release.project_id,
            event_type: EventType::Release,
            related_id: release.id.to_string(),
            name: release.name.clone(),
            description: release.description.clone(),
            start_date: None,
            end_date: release.deadline,
            location: None,
        }
    }

    /// Estimate and deadline events of a task, for whichever dates are set
    pub fn from_task(task: &Task) -> Vec<Self> {
        let dated = [
            (EventType::TaskEstimate, task.estimated_date),
            (EventType::TaskDeadline, task.deadline),
        ];
        dated
            .into_iter()
            .filter_map(|(event_type, date)| {
                date.map(|end_date| Self {
                    project_id: task.project_id,
                    event_type,
                    related_id: task.number.to_string(),
                    name: task.name.clone(),
                    description: task.description.clone(),
                    start_date: None,
                    end_date,
                    location: None,
                })
            })
            .collect()
    }

    fn begins(&self) -> DateTime<Utc> {
        self.start_date.unwrap_or(self.end_date)
    }

    /// Whether the event overlaps the closed range `[from, to]`
    pub fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.begins() <= to && self.end_date >= from
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.begins()
            .cmp(&other.begins())
            .then_with(|| self.end_date.cmp(&other.end_date))
            .then_with(|| self.event_type.cmp(&other.event_type))
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.project_id.cmp(&other.project_id))
            .then_with(|| self.related_id.cmp(&other.related_id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Event query options; no types means every type
#[derive(Debug, Clone)]
pub struct EventFilter {
    /// When false, task events whose task sits in a final status are hidden
    pub show_ended: bool,
    pub types: Vec<EventType>,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            show_ended: true,
            types: Vec::new(),
        }
    }
}

impl EventFilter {
    fn includes(&self, event_type: EventType) -> bool {
        self.types.is_empty() || self.types.contains(&event_type)
    }

    pub fn show_meetings(&self) -> bool {
        self.includes(EventType::Meeting)
    }

    pub fn show_sprints(&self) -> bool {
        self.includes(EventType::Sprint)
    }

    pub fn show_releases(&self) -> bool {
        self.includes(EventType::Release)
    }

    /// Either task type brings in both estimate and deadline events
    pub fn show_tasks(&self) -> bool {
        self.includes(EventType::TaskEstimate) || self.includes(EventType::TaskDeadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::SYSTEM_USER_ID;
    use chrono::Duration;

    #[test]
    fn test_task_events_follow_set_dates() {
        let mut task = Task::new(Uuid::nil(), 4, "Ship", Uuid::nil(), SYSTEM_USER_ID);
        assert!(Event::from_task(&task).is_empty());

        task.deadline = Some(Utc::now());
        let events = Event::from_task(&task);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::TaskDeadline);
        assert_eq!(events[0].related_id, "4");
    }

    #[test]
    fn test_ordering_uses_end_when_start_missing() {
        let now = Utc::now();
        let base = Event {
            project_id: Uuid::nil(),
            event_type: EventType::Release,
            related_id: "a".to_string(),
            name: "Release".to_string(),
            description: String::new(),
            start_date: None,
            end_date: now,
            location: None,
        };
        let meeting = Event {
            event_type: EventType::Meeting,
            start_date: Some(now - Duration::hours(1)),
            end_date: now + Duration::hours(1),
            ..base.clone()
        };
        let tie = Event {
            event_type: EventType::Sprint,
            ..base.clone()
        };

        let mut events = vec![base.clone(), meeting.clone(), tie.clone()];
        events.sort();
        assert_eq!(events, vec![meeting, tie, base]);
    }

    #[test]
    fn test_filter_task_types_are_grouped() {
        let filter = EventFilter {
            show_ended: true,
            types: vec![EventType::TaskEstimate],
        };
        assert!(filter.show_tasks());
        assert!(!filter.show_meetings());
        assert!(EventFilter::default().show_releases());
    }

    #[test]
    fn test_overlaps_range() {
        let now = Utc::now();
        let event = Event {
            project_id: Uuid::nil(),
            event_type: EventType::Sprint,
            related_id: String::new(),
            name: "Sprint".to_string(),
            description: String::new(),
            start_date: Some(now - Duration::days(3)),
            end_date: now + Duration::days(3),
            location: None,
        };
        assert!(event.overlaps(now, now + Duration::days(10)));
        assert!(!event.overlaps(now + Duration::days(4), now + Duration::days(10)));
    }
}
