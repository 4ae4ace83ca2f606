//! Workspace API routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use vernite_core::workspace::{CreateWorkspaceRequest, UpdateWorkspaceRequest, WorkspaceSummary};

use super::{core_error, CurrentUser, RouteError};
use crate::state::AppState;

/// GET /api/workspace - Workspaces of the caller with their project ids
async fn list_workspaces(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Json<Vec<WorkspaceSummary>> {
    Json(state.tracker().list_workspaces(user.id()).await)
}

async fn create_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateWorkspaceRequest>,
) -> Result<(StatusCode, Json<WorkspaceSummary>), RouteError> {
    let workspace = state
        .tracker()
        .create_workspace(user.id(), &req.name)
        .await
        .map_err(core_error)?;
    Ok((StatusCode::CREATED, Json(workspace)))
}

async fn get_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<WorkspaceSummary>, RouteError> {
    let workspace = state
        .tracker()
        .get_workspace(user.id(), id)
        .await
        .map_err(core_error)?;
    Ok(Json(workspace))
}

async fn update_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
    Json(req): Json<UpdateWorkspaceRequest>,
) -> Result<Json<WorkspaceSummary>, RouteError> {
    let tracker = state.tracker();
    let workspace = match req.name {
        Some(name) => tracker.rename_workspace(user.id(), id, &name).await,
        None => tracker.get_workspace(user.id(), id).await,
    }
    .map_err(core_error)?;
    Ok(Json(workspace))
}

async fn delete_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<StatusCode, RouteError> {
    state
        .tracker()
        .delete_workspace(user.id(), id)
        .await
        .map_err(core_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/workspace", get(list_workspaces).post(create_workspace))
        .route(
            "/api/workspace/{id}",
            get(get_workspace)
                .put(update_workspace)
                .delete(delete_workspace),
        )
}
