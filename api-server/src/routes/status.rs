//! Status column routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;
use vernite_core::status::{CreateStatusRequest, Status, UpdateStatusRequest};

use super::{core_error, CurrentUser, RouteError};
use crate::state::AppState;

async fn list_statuses(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<Status>>, RouteError> {
    let statuses = state
        .tracker()
        .list_statuses(user.id(), project_id)
        .await
        .map_err(core_error)?;
    Ok(Json(statuses))
}

async fn create_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateStatusRequest>,
) -> Result<(StatusCode, Json<Status>), RouteError> {
    let status = state
        .tracker()
        .create_status(user.id(), project_id, req)
        .await
        .map_err(core_error)?;
    Ok((StatusCode::CREATED, Json(status)))
}

async fn get_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Status>, RouteError> {
    let status = state
        .tracker()
        .get_status(user.id(), project_id, id)
        .await
        .map_err(core_error)?;
    Ok(Json(status))
}

async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Status>, RouteError> {
    let status = state
        .tracker()
        .update_status(user.id(), project_id, id, req)
        .await
        .map_err(core_error)?;
    Ok(Json(status))
}

async fn delete_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, RouteError> {
    state
        .tracker()
        .delete_status(user.id(), project_id, id)
        .await
        .map_err(core_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/project/{project_id}/status",
            get(list_statuses).post(create_status),
        )
        .route(
            "/api/project/{project_id}/status/{id}",
            get(get_status).put(update_status).delete(delete_status),
        )
}
