//! Task API endpoints
//!
//! Tasks are addressed by their per-project number. Creating or editing a
//! task may carry `issue`/`pull` actions for the GitHub integration; every
//! edit is pushed to the linked issue and pull request.

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;
use vernite_core::git::{IssueAction, PullAction};
use vernite_core::task::{CreateTaskRequest, Task, TaskFilter, TaskType, UpdateTaskRequest};
use vernite_core::time_track::{CreateTimeTrackRequest, TimeTrack, UpdateTimeTrackRequest};
use vernite_github::model::TaskLinks;

use super::{
    bad_request, core_error, github_error, github_service, parse_query, query_pairs,
    query_values, CurrentUser, RouteError,
};
use crate::state::AppState;

/// A task together with its GitHub links
#[derive(Debug, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    #[serde(flatten)]
    pub links: TaskLinks,
}

pub async fn task_view(state: &AppState, task: Task) -> TaskView {
    let links = match state.github() {
        Some(github) => github.task_links(&task).await,
        None => TaskLinks::default(),
    };
    TaskView { task, links }
}

pub async fn task_views(state: &AppState, tasks: Vec<Task>) -> Vec<TaskView> {
    let mut views = Vec::with_capacity(tasks.len());
    for task in tasks {
        views.push(task_view(state, task).await);
    }
    views
}

/// Run the git actions of a request. Explicit actions fail the request;
/// the implicit push of an edit only logs.
async fn sync_task(
    state: &AppState,
    task: &Task,
    issue: Option<IssueAction>,
    pull: Option<PullAction>,
) -> Result<(), RouteError> {
    let explicit = issue.is_some() || pull.is_some();
    let Some(github) = state.github() else {
        return if explicit {
            github_service(state).map(|_| ())
        } else {
            Ok(())
        };
    };
    match github.apply_task_actions(task, issue, pull).await {
        Ok(()) => Ok(()),
        Err(err) if !explicit => {
            tracing::warn!(task_id = %task.id, error = %err, "failed to push task to GitHub");
            Ok(())
        }
        Err(err) => Err(github_error(err)),
    }
}

fn task_filter(query: Option<&str>) -> Result<TaskFilter, RouteError> {
    let pairs = query_pairs(query);
    let status_ids = query_values(&pairs, "statusId")
        .map(|value| {
            value
                .parse::<Uuid>()
                .map_err(|_| bad_request(format!("invalid statusId '{}'", value)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let types = query_values(&pairs, "type")
        .map(|value| {
            serde_json::from_value::<TaskType>(serde_json::Value::String(value.to_uppercase()))
                .map_err(|_| bad_request(format!("invalid task type '{}'", value)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TaskFilter {
        sprint_id: parse_query(&pairs, "sprintId")?,
        assignee_id: parse_query(&pairs, "assigneeId")?,
        status_ids,
        types,
        parent_id: parse_query(&pairs, "parentId")?,
        backlog: parse_query(&pairs, "backlog")?.unwrap_or(false),
    })
}

/// GET /api/project/{project_id}/task - List tasks matching the query filters
async fn list_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<Uuid>,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<TaskView>>, RouteError> {
    let filter = task_filter(query.as_deref())?;
    let tasks = state
        .tracker()
        .list_tasks(user.id(), project_id, &filter)
        .await
        .map_err(core_error)?;
    Ok(Json(task_views(&state, tasks).await))
}

async fn create_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<Uuid>,
    Json(mut req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskView>), RouteError> {
    let issue = req.issue.take();
    let pull = req.pull.take();
    if issue.is_some() || pull.is_some() {
        github_service(&state)?;
    }

    let task = state
        .tracker()
        .create_task(user.id(), project_id, req)
        .await
        .map_err(core_error)?;
    if issue.is_some() || pull.is_some() {
        if let Err(err) = sync_task(&state, &task, issue, pull).await {
            // The client sees a failure, so the task must not survive it
            if let Err(rollback) = state
                .tracker()
                .delete_task(user.id(), project_id, task.number)
                .await
            {
                tracing::warn!(task_id = %task.id, error = %rollback, "failed to roll back task");
            }
            return Err(err);
        }
    }
    Ok((StatusCode::CREATED, Json(task_view(&state, task).await)))
}

async fn get_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, number)): Path<(Uuid, u64)>,
) -> Result<Json<TaskView>, RouteError> {
    let task = state
        .tracker()
        .get_task(user.id(), project_id, number)
        .await
        .map_err(core_error)?;
    Ok(Json(task_view(&state, task).await))
}

async fn update_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, number)): Path<(Uuid, u64)>,
    Json(mut req): Json<UpdateTaskRequest>,
) -> Result<Json<TaskView>, RouteError> {
    let issue = req.issue.take();
    let pull = req.pull.take();
    if issue.is_some() || pull.is_some() {
        github_service(&state)?;
    }

    let task = state
        .tracker()
        .update_task(user.id(), project_id, number, req)
        .await
        .map_err(core_error)?;
    sync_task(&state, &task, issue, pull).await?;
    Ok(Json(task_view(&state, task).await))
}

async fn delete_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, number)): Path<(Uuid, u64)>,
) -> Result<StatusCode, RouteError> {
    let task = state
        .tracker()
        .delete_task(user.id(), project_id, number)
        .await
        .map_err(core_error)?;
    if let Some(github) = state.github() {
        github.forget_task(task.id).await.map_err(github_error)?;
    }
    Ok(StatusCode::NO_CONTENT)
}

// Time tracking

async fn list_time_tracks(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, number)): Path<(Uuid, u64)>,
) -> Result<Json<Vec<TimeTrack>>, RouteError> {
    let tracks = state
        .tracker()
        .task_time_tracks(user.id(), project_id, number)
        .await
        .map_err(core_error)?;
    Ok(Json(tracks))
}

async fn create_time_track(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, number)): Path<(Uuid, u64)>,
    Json(req): Json<CreateTimeTrackRequest>,
) -> Result<(StatusCode, Json<TimeTrack>), RouteError> {
    let track = state
        .tracker()
        .create_time_track(user.id(), project_id, number, req)
        .await
        .map_err(core_error)?;
    Ok((StatusCode::CREATED, Json(track)))
}

async fn start_tracking(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, number)): Path<(Uuid, u64)>,
) -> Result<Json<TimeTrack>, RouteError> {
    let track = state
        .tracker()
        .start_tracking(user.id(), project_id, number)
        .await
        .map_err(core_error)?;
    Ok(Json(track))
}

async fn stop_tracking(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, number)): Path<(Uuid, u64)>,
) -> Result<Json<TimeTrack>, RouteError> {
    let track = state
        .tracker()
        .stop_tracking(user.id(), project_id, number)
        .await
        .map_err(core_error)?;
    Ok(Json(track))
}

async fn update_time_track(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, number, id)): Path<(Uuid, u64, Uuid)>,
    Json(req): Json<UpdateTimeTrackRequest>,
) -> Result<Json<TimeTrack>, RouteError> {
    let track = state
        .tracker()
        .update_time_track(user.id(), project_id, number, id, req)
        .await
        .map_err(core_error)?;
    Ok(Json(track))
}

async fn delete_time_track(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, number, id)): Path<(Uuid, u64, Uuid)>,
) -> Result<StatusCode, RouteError> {
    state
        .tracker()
        .delete_time_track(user.id(), project_id, number, id)
        .await
        .map_err(core_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/project/{project_id}/task",
            get(list_tasks).post(create_task),
        )
        .route(
            "/api/project/{project_id}/task/{number}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route(
            "/api/project/{project_id}/task/{number}/track",
            get(list_time_tracks).post(create_time_track),
        )
        .route(
            "/api/project/{project_id}/task/{number}/track/start",
            post(start_tracking),
        )
        .route(
            "/api/project/{project_id}/task/{number}/track/stop",
            post(stop_tracking),
        )
        .route(
            "/api/project/{project_id}/task/{number}/track/{id}",
            put(update_time_track).delete(delete_time_track),
        )
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    use crate::routes::test_support::{test_app, TestApp};

    async fn first_status(app: &TestApp, token: &str, project: &str) -> Value {
        let (_, statuses) = app
            .json(
                Method::GET,
                &format!("/api/project/{}/status", project),
                Some(token),
                None,
            )
            .await;
        statuses[0]["id"].clone()
    }

    #[tokio::test]
    async fn test_task_crud_and_numbering() {
        let app = test_app().await;
        let token = app.register("ada").await;
        let project = app.project(&token).await;
        let status_id = first_status(&app, &token, &project).await;
        let base = format!("/api/project/{}/task", project);

        let (status, first) = app
            .json(
                Method::POST,
                &base,
                Some(&token),
                Some(json!({ "name": "First", "statusId": status_id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", first);
        assert_eq!(first["number"], 1);
        assert_eq!(first["priority"], "low");
        assert_eq!(first["merged"], false);
        assert!(first.get("issue").is_none());

        let (_, second) = app
            .json(
                Method::POST,
                &base,
                Some(&token),
                Some(json!({ "name": "Second", "statusId": status_id, "type": "EPIC" })),
            )
            .await;
        assert_eq!(second["number"], 2);

        let (status, updated) = app
            .json(
                Method::PUT,
                &format!("{}/1", base),
                Some(&token),
                Some(json!({ "name": "Renamed", "parentTaskId": 2 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", updated);
        assert_eq!(updated["name"], "Renamed");
        assert_eq!(updated["parentTaskId"], 2);

        let (status, epics) = app
            .json(Method::GET, &format!("{}?type=EPIC", base), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(epics.as_array().unwrap().len(), 1);

        let (status, _) = app
            .json(Method::DELETE, &format!("{}/2", base), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app
            .json(Method::GET, &format!("{}/2", base), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_subtask_requires_parent() {
        let app = test_app().await;
        let token = app.register("ada").await;
        let project = app.project(&token).await;
        let status_id = first_status(&app, &token, &project).await;

        let (status, body) = app
            .json(
                Method::POST,
                &format!("/api/project/{}/task", project),
                Some(&token),
                Some(json!({ "name": "Orphan", "statusId": status_id, "type": "SUBTASK" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("parent"));
    }

    #[tokio::test]
    async fn test_git_action_without_github_is_not_implemented() {
        let app = test_app().await;
        let token = app.register("ada").await;
        let project = app.project(&token).await;
        let status_id = first_status(&app, &token, &project).await;

        let (status, _) = app
            .json(
                Method::POST,
                &format!("/api/project/{}/task", project),
                Some(&token),
                Some(json!({ "name": "Linked", "statusId": status_id, "issue": "create" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);

        let (_, tasks) = app
            .json(
                Method::GET,
                &format!("/api/project/{}/task", project),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(tasks, json!([]));
    }

    #[tokio::test]
    async fn test_time_tracking() {
        let app = test_app().await;
        let token = app.register("ada").await;
        let project = app.project(&token).await;
        let status_id = first_status(&app, &token, &project).await;
        app.json(
            Method::POST,
            &format!("/api/project/{}/task", project),
            Some(&token),
            Some(json!({ "name": "Tracked", "statusId": status_id })),
        )
        .await;
        let base = format!("/api/project/{}/task/1/track", project);

        let (status, _) = app
            .json(Method::POST, &format!("{}/start", base), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app
            .json(Method::POST, &format!("{}/start", base), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, stopped) = app
            .json(Method::POST, &format!("{}/stop", base), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(stopped["endDate"].is_string());

        let (status, manual) = app
            .json(
                Method::POST,
                &base,
                Some(&token),
                Some(json!({
                    "startDate": "2024-01-01T08:00:00Z",
                    "endDate": "2024-01-01T10:00:00Z"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(manual["edited"], true);

        let (_, tracks) = app.json(Method::GET, &base, Some(&token), None).await;
        assert_eq!(tracks.as_array().unwrap().len(), 2);

        let (_, mine) = app
            .json(Method::GET, "/api/auth/me/track", Some(&token), None)
            .await;
        assert_eq!(mine.as_array().unwrap().len(), 2);

        let uri = format!("{}/{}", base, manual["id"].as_str().unwrap());
        let (status, _) = app.json(Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
