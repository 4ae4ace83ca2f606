//! Project API routes
//!
//! Projects, their members and invitations, plus the per-project views of
//! time tracks, calendar events and the linked repository.

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;
use vernite_core::event::Event;
use vernite_core::git::{Branch, Issue, PullRequest};
use vernite_core::project::{
    CreateProjectRequest, ProjectInviteRequest, ProjectMember, ProjectRole, UpdateProjectRequest,
};
use vernite_core::time_track::TimeTrack;
use vernite_core::tracker::ProjectDetails;

use super::{core_error, event_window, github_error, query_pairs, CurrentUser, RouteError};
use crate::auth::UserSummary;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    #[serde(flatten)]
    pub details: ProjectDetails,
    /// `owner/name` of the linked GitHub repository
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_integration: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub user: UserSummary,
    pub role: ProjectRole,
    pub privileges: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteResponse {
    /// Usernames of the invited users
    pub emails: Vec<String>,
    pub projects: Vec<ProjectDetails>,
}

async fn project_view(state: &AppState, user_id: Uuid, details: ProjectDetails) -> ProjectView {
    let github_integration = match state.github() {
        Some(github) => github
            .project_integration(user_id, details.project.id)
            .await
            .ok()
            .flatten()
            .map(|integration| integration.full_name()),
        None => None,
    };
    ProjectView {
        details,
        github_integration,
    }
}

/// Join members with their accounts, ordered by username
async fn member_views(state: &AppState, members: Vec<ProjectMember>) -> Vec<MemberView> {
    let ids: Vec<Uuid> = members.iter().map(|member| member.user_id).collect();
    let mut users = state.auth_store().get_users(&ids).await;
    let mut views: Vec<MemberView> = members
        .into_iter()
        .filter_map(|member| {
            users.remove(&member.user_id).map(|user| MemberView {
                user,
                role: member.role,
                privileges: member.role.privileges(),
            })
        })
        .collect();
    views.sort_by(|a, b| a.user.username.cmp(&b.user.username));
    views
}

async fn list_projects(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Json<Vec<ProjectDetails>> {
    Json(state.tracker().list_projects(user.id()).await)
}

async fn create_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectView>), RouteError> {
    let details = state
        .tracker()
        .create_project(user.id(), req)
        .await
        .map_err(core_error)?;
    Ok((
        StatusCode::CREATED,
        Json(project_view(&state, user.id(), details).await),
    ))
}

async fn get_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectView>, RouteError> {
    let details = state
        .tracker()
        .get_project(user.id(), id)
        .await
        .map_err(core_error)?;
    Ok(Json(project_view(&state, user.id(), details).await))
}

async fn update_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<Json<ProjectView>, RouteError> {
    let details = state
        .tracker()
        .update_project(user.id(), id, req)
        .await
        .map_err(core_error)?;
    Ok(Json(project_view(&state, user.id(), details).await))
}

async fn delete_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, RouteError> {
    state
        .tracker()
        .delete_project(user.id(), id)
        .await
        .map_err(core_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_members(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MemberView>>, RouteError> {
    let members = state
        .tracker()
        .list_members(user.id(), id)
        .await
        .map_err(core_error)?;
    Ok(Json(member_views(&state, members).await))
}

async fn get_member(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MemberView>, RouteError> {
    let member = state
        .tracker()
        .get_member(user.id(), id, member_id)
        .await
        .map_err(core_error)?;
    member_views(&state, vec![member])
        .await
        .pop()
        .map(Json)
        .ok_or_else(|| core_error(vernite_core::Error::not_found("User", member_id)))
}

/// POST /api/project/member - Invite users by e-mail or username
async fn invite_members(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ProjectInviteRequest>,
) -> Result<Json<InviteResponse>, RouteError> {
    let invitees = state.auth_store().find_by_logins(&req.emails).await;
    let ids: Vec<Uuid> = invitees.iter().map(|invitee| invitee.id).collect();
    let accepted = state
        .tracker()
        .invite(user.id(), &ids, &req.projects)
        .await
        .map_err(core_error)?;
    if accepted.is_empty() {
        return Ok(Json(InviteResponse {
            emails: Vec::new(),
            projects: Vec::new(),
        }));
    }

    let mut projects = Vec::with_capacity(accepted.len());
    for project_id in accepted {
        projects.push(
            state
                .tracker()
                .get_project(user.id(), project_id)
                .await
                .map_err(core_error)?,
        );
    }
    Ok(Json(InviteResponse {
        emails: invitees.into_iter().map(|invitee| invitee.username).collect(),
        projects,
    }))
}

/// PUT /api/project/{id}/member - Remove members; answers with the removed users
async fn remove_members(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(user_ids): Json<Vec<Uuid>>,
) -> Result<Json<Vec<UserSummary>>, RouteError> {
    let removed = state
        .tracker()
        .remove_members(user.id(), id, &user_ids)
        .await
        .map_err(core_error)?;
    let users = state.auth_store().get_users(&removed).await;
    Ok(Json(
        removed
            .iter()
            .filter_map(|id| users.get(id).cloned())
            .collect(),
    ))
}

/// DELETE /api/project/{id}/member - Leave the project
async fn leave_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, RouteError> {
    state
        .tracker()
        .leave_project(user.id(), id)
        .await
        .map_err(core_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn project_time_tracks(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TimeTrack>>, RouteError> {
    let tracks = state
        .tracker()
        .project_time_tracks(user.id(), id)
        .await
        .map_err(core_error)?;
    Ok(Json(tracks))
}

async fn project_events(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<Event>>, RouteError> {
    let pairs = query_pairs(query.as_deref());
    let (from, to, filter) = event_window(&pairs)?;
    let events = state
        .tracker()
        .project_events(user.id(), id, from, to, &filter)
        .await
        .map_err(core_error)?;
    Ok(Json(events))
}

/// Membership is checked even when the GitHub integration is disabled
async fn require_member(
    state: &AppState,
    user: &CurrentUser,
    id: Uuid,
) -> Result<(), RouteError> {
    state
        .tracker()
        .get_project(user.id(), id)
        .await
        .map(|_| ())
        .map_err(core_error)
}

async fn git_issues(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Issue>>, RouteError> {
    require_member(&state, &user, id).await?;
    let issues = match state.github() {
        Some(github) => github.issues(user.id(), id).await.map_err(github_error)?,
        None => Vec::new(),
    };
    Ok(Json(issues))
}

async fn git_pulls(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PullRequest>>, RouteError> {
    require_member(&state, &user, id).await?;
    let pulls = match state.github() {
        Some(github) => github
            .pull_requests(user.id(), id)
            .await
            .map_err(github_error)?,
        None => Vec::new(),
    };
    Ok(Json(pulls))
}

async fn git_branches(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Branch>>, RouteError> {
    require_member(&state, &user, id).await?;
    let branches = match state.github() {
        Some(github) => github.branches(user.id(), id).await.map_err(github_error)?,
        None => Vec::new(),
    };
    Ok(Json(branches))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/project", get(list_projects).post(create_project))
        .route("/api/project/member", post(invite_members))
        .route(
            "/api/project/{project_id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route(
            "/api/project/{project_id}/member",
            get(list_members).put(remove_members).delete(leave_project),
        )
        .route("/api/project/{project_id}/member/{member_id}", get(get_member))
        .route("/api/project/{project_id}/track", get(project_time_tracks))
        .route("/api/project/{project_id}/events", get(project_events))
        .route("/api/project/{project_id}/integration/git/issue", get(git_issues))
        .route("/api/project/{project_id}/integration/git/pull", get(git_pulls))
        .route("/api/project/{project_id}/integration/git/branch", get(git_branches))
}
