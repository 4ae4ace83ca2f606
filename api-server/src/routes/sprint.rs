//! Sprint routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use vernite_core::sprint::{CreateSprintRequest, Sprint, SprintStatus, UpdateSprintRequest};

use super::{bad_request, core_error, CurrentUser, RouteError};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
struct SprintQuery {
    status: Option<String>,
}

/// GET /api/project/{project_id}/sprint?status=active
async fn list_sprints(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<Uuid>,
    Query(query): Query<SprintQuery>,
) -> Result<Json<Vec<Sprint>>, RouteError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(
            SprintStatus::parse(raw)
                .ok_or_else(|| bad_request(format!("unknown sprint status: {}", raw)))?,
        ),
        None => None,
    };
    let sprints = state
        .tracker()
        .list_sprints(user.id(), project_id, status)
        .await
        .map_err(core_error)?;
    Ok(Json(sprints))
}

async fn create_sprint(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateSprintRequest>,
) -> Result<(StatusCode, Json<Sprint>), RouteError> {
    let sprint = state
        .tracker()
        .create_sprint(user.id(), project_id, req)
        .await
        .map_err(core_error)?;
    Ok((StatusCode::CREATED, Json(sprint)))
}

async fn get_sprint(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Sprint>, RouteError> {
    let sprint = state
        .tracker()
        .get_sprint(user.id(), project_id, id)
        .await
        .map_err(core_error)?;
    Ok(Json(sprint))
}

async fn update_sprint(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateSprintRequest>,
) -> Result<Json<Sprint>, RouteError> {
    let sprint = state
        .tracker()
        .update_sprint(user.id(), project_id, id, req)
        .await
        .map_err(core_error)?;
    Ok(Json(sprint))
}

async fn delete_sprint(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, RouteError> {
    state
        .tracker()
        .delete_sprint(user.id(), project_id, id)
        .await
        .map_err(core_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/project/{project_id}/sprint",
            get(list_sprints).post(create_sprint),
        )
        .route(
            "/api/project/{project_id}/sprint/{id}",
            get(get_sprint).put(update_sprint).delete(delete_sprint),
        )
}
