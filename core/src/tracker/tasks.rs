use uuid::Uuid;

use crate::error::Error;
use crate::task::{CreateTaskRequest, Task, TaskFilter, UpdateTaskRequest};
use crate::validation;
use crate::Result;

use super::Tracker;

/// References a task held before an edit, so unchanged links are not
/// re-checked against sprint and release state.
#[derive(Default)]
struct PreviousLinks {
    sprint_id: Option<Uuid>,
    release_id: Option<Uuid>,
}

impl Tracker {
    pub async fn list_tasks(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>> {
        self.require_member(user_id, project_id).await?;
        let tasks = self.tasks.list(project_id).await?;
        Ok(tasks.into_iter().filter(|t| filter.matches(t)).collect())
    }

    pub async fn get_task(&self, user_id: Uuid, project_id: Uuid, number: u64) -> Result<Task> {
        self.require_member(user_id, project_id).await?;
        self.task_in(project_id, number).await
    }

    /// Tasks assigned to the caller across the projects they still belong to
    pub async fn assigned_tasks(&self, user_id: Uuid) -> Result<Vec<Task>> {
        let mut result = Vec::new();
        for task in self.tasks.find_by_assignee(user_id).await? {
            if self.is_member(user_id, task.project_id).await {
                result.push(task);
            }
        }
        Ok(result)
    }

    pub async fn create_task(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        request: CreateTaskRequest,
    ) -> Result<Task> {
        self.require_member(user_id, project_id).await?;

        let mut task = Task::new(
            project_id,
            0,
            validation::name(&request.name)?,
            request.status_id,
            user_id,
        )
        .with_description(validation::description(&request.description)?)
        .with_type(request.task_type)
        .with_priority(request.priority);
        task.assignee_id = request.assignee_id;
        task.parent_task_id = request.parent_task_id;
        task.sprint_id = request.sprint_id;
        task.release_id = request.release_id;
        task.deadline = request.deadline;
        task.estimated_date = request.estimated_date;
        task.story_points = request.story_points;

        self.check_task(&task, &PreviousLinks::default()).await?;

        task.number = self.projects.next_task_number(project_id).await?;
        let task = self.tasks.create(task).await?;
        tracing::debug!(project_id = %project_id, number = task.number, "task created");
        Ok(task)
    }

    pub async fn update_task(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        number: u64,
        request: UpdateTaskRequest,
    ) -> Result<Task> {
        self.require_member(user_id, project_id).await?;
        let current = self.task_in(project_id, number).await?;
        let previous = PreviousLinks {
            sprint_id: current.sprint_id,
            release_id: current.release_id,
        };

        let mut task = current;
        if let Some(name) = &request.name {
            task.name = validation::name(name)?;
        }
        if let Some(description) = &request.description {
            task.description = validation::description(description)?;
        }
        if let Some(status_id) = request.status_id {
            task.status_id = status_id;
        }
        if let Some(task_type) = request.task_type {
            task.task_type = task_type;
        }
        if let Some(priority) = request.priority {
            task.priority = priority;
        }
        if let Some(assignee_id) = request.assignee_id {
            task.assignee_id = assignee_id;
        }
        if let Some(parent_task_id) = request.parent_task_id {
            task.parent_task_id = parent_task_id;
        }
        if let Some(sprint_id) = request.sprint_id {
            task.sprint_id = sprint_id;
        }
        if let Some(release_id) = request.release_id {
            task.release_id = release_id;
        }
        if let Some(deadline) = request.deadline {
            task.deadline = deadline;
        }
        if let Some(estimated_date) = request.estimated_date {
            task.estimated_date = estimated_date;
        }
        if let Some(story_points) = request.story_points {
            task.story_points = story_points;
        }

        self.check_task(&task, &previous).await?;
        for child in self.tasks.find_children(project_id, number).await? {
            child.check_parent(Some(&task))?;
        }

        self.tasks.update(task).await
    }

    /// Soft delete a task and detach its children. Returns the deleted task.
    pub async fn delete_task(&self, user_id: Uuid, project_id: Uuid, number: u64) -> Result<Task> {
        self.require_member(user_id, project_id).await?;
        let task = self.task_in(project_id, number).await?;
        self.remove_task(task).await
    }

    pub(super) async fn remove_task(&self, task: Task) -> Result<Task> {
        for mut child in self.tasks.find_children(task.project_id, task.number).await? {
            child.parent_task_id = None;
            self.tasks.update(child).await?;
        }
        self.tasks.soft_delete(task.id).await?;
        tracing::debug!(project_id = %task.project_id, number = task.number, "task deleted");
        Ok(task)
    }

    /// Move a task to the first begin status when opening, otherwise to the
    /// first final status. Projects without such a status leave it in place.
    pub async fn change_state(&self, mut task: Task, open: bool) -> Result<Task> {
        let target = if open {
            self.statuses.first_begin(task.project_id).await
        } else {
            self.statuses.first_final(task.project_id).await
        };
        let Some(status) = target else {
            return Ok(task);
        };
        if status.id == task.status_id {
            return Ok(task);
        }
        task.status_id = status.id;
        self.tasks.update(task).await
    }

    /// Whether the task's status is a final one
    pub async fn is_done(&self, task: &Task) -> bool {
        self.statuses
            .get(task.project_id, task.status_id)
            .await
            .is_some_and(|s| s.is_final)
    }

    async fn check_task(&self, task: &Task, previous: &PreviousLinks) -> Result<()> {
        let project_id = task.project_id;

        if self.statuses.get(project_id, task.status_id).await.is_none() {
            return Err(Error::InvalidInput(
                "status does not belong to project".to_string(),
            ));
        }

        if let Some(assignee) = task.assignee_id {
            if self.projects.member(project_id, assignee).await.is_none() {
                return Err(Error::InvalidInput(
                    "assignee is not a project member".to_string(),
                ));
            }
        }

        if task.sprint_id != previous.sprint_id {
            if let Some(old) = previous.sprint_id {
                if self
                    .sprints
                    .get(project_id, old)
                    .await
                    .is_some_and(|s| s.is_closed())
                {
                    return Err(Error::InvalidInput(
                        "cannot remove task from closed sprint".to_string(),
                    ));
                }
            }
            if let Some(new) = task.sprint_id {
                let sprint = self.sprints.get(project_id, new).await.ok_or_else(|| {
                    Error::InvalidInput("sprint does not belong to project".to_string())
                })?;
                if sprint.is_closed() {
                    return Err(Error::InvalidInput(
                        "cannot add task to closed sprint".to_string(),
                    ));
                }
            }
        }

        if task.release_id != previous.release_id {
            if let Some(new) = task.release_id {
                let release = self.releases.get(project_id, new).await.ok_or_else(|| {
                    Error::InvalidInput("release does not belong to project".to_string())
                })?;
                if release.released {
                    return Err(Error::Conflict(
                        "cannot add task to released release".to_string(),
                    ));
                }
            }
        }

        let parent = match task.parent_task_id {
            Some(number) => Some(
                self.tasks
                    .get_by_number(project_id, number)
                    .await?
                    .ok_or_else(|| Error::InvalidInput("invalid parent task".to_string()))?,
            ),
            None => None,
        };
        task.check_parent(parent.as_ref())
    }
}
