//! Release routes, including publishing to the linked repository

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;
use vernite_core::release::{
    CreateReleaseRequest, PublishReleaseRequest, Release, UpdateReleaseRequest,
};

use super::{core_error, github_error, CurrentUser, RouteError};
use crate::state::AppState;

async fn list_releases(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<Release>>, RouteError> {
    let releases = state
        .tracker()
        .list_releases(user.id(), project_id)
        .await
        .map_err(core_error)?;
    Ok(Json(releases))
}

async fn create_release(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateReleaseRequest>,
) -> Result<(StatusCode, Json<Release>), RouteError> {
    let release = state
        .tracker()
        .create_release(user.id(), project_id, req)
        .await
        .map_err(core_error)?;
    Ok((StatusCode::CREATED, Json(release)))
}

async fn get_release(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Release>, RouteError> {
    let release = state
        .tracker()
        .get_release(user.id(), project_id, id)
        .await
        .map_err(core_error)?;
    Ok(Json(release))
}

async fn update_release(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateReleaseRequest>,
) -> Result<Json<Release>, RouteError> {
    let release = state
        .tracker()
        .update_release(user.id(), project_id, id, req)
        .await
        .map_err(core_error)?;
    Ok(Json(release))
}

async fn delete_release(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, RouteError> {
    state
        .tracker()
        .delete_release(user.id(), project_id, id)
        .await
        .map_err(core_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/project/{project_id}/release/{id}/publish?branch=main&publishGitService=true
///
/// The release is only marked as released once the optional GitHub
/// release has been created, so a failed upstream call leaves it open.
async fn publish_release(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
    Query(req): Query<PublishReleaseRequest>,
) -> Result<Json<Release>, RouteError> {
    let tracker = state.tracker();
    let release = tracker
        .release_ready(user.id(), project_id, id)
        .await
        .map_err(core_error)?;

    let git_release_id = match state.github() {
        Some(github) if req.publish_git_service => github
            .publish_release(&release, req.branch)
            .await
            .map_err(github_error)?,
        _ => None,
    };

    let release = tracker
        .mark_released(project_id, id, git_release_id)
        .await
        .map_err(core_error)?;
    Ok(Json(release))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/project/{project_id}/release",
            get(list_releases).post(create_release),
        )
        .route(
            "/api/project/{project_id}/release/{id}",
            get(get_release).put(update_release).delete(delete_release),
        )
        .route(
            "/api/project/{project_id}/release/{id}/publish",
            put(publish_release),
        )
}
