//! Meeting routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;
use vernite_core::meeting::{CreateMeetingRequest, Meeting, UpdateMeetingRequest};

use super::{core_error, CurrentUser, RouteError};
use crate::state::AppState;

async fn list_meetings(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<Meeting>>, RouteError> {
    let meetings = state
        .tracker()
        .list_meetings(user.id(), project_id)
        .await
        .map_err(core_error)?;
    Ok(Json(meetings))
}

/// Participants outside the project are dropped silently
async fn create_meeting(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateMeetingRequest>,
) -> Result<(StatusCode, Json<Meeting>), RouteError> {
    let meeting = state
        .tracker()
        .create_meeting(user.id(), project_id, req)
        .await
        .map_err(core_error)?;
    Ok((StatusCode::CREATED, Json(meeting)))
}

async fn get_meeting(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Meeting>, RouteError> {
    let meeting = state
        .tracker()
        .get_meeting(user.id(), project_id, id)
        .await
        .map_err(core_error)?;
    Ok(Json(meeting))
}

async fn update_meeting(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateMeetingRequest>,
) -> Result<Json<Meeting>, RouteError> {
    let meeting = state
        .tracker()
        .update_meeting(user.id(), project_id, id, req)
        .await
        .map_err(core_error)?;
    Ok(Json(meeting))
}

async fn delete_meeting(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, RouteError> {
    state
        .tracker()
        .delete_meeting(user.id(), project_id, id)
        .await
        .map_err(core_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/project/{project_id}/meeting",
            get(list_meetings).post(create_meeting),
        )
        .route(
            "/api/project/{project_id}/meeting/{id}",
            get(get_meeting).put(update_meeting).delete(delete_meeting),
        )
}
