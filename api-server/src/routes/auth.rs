//! Account, session and "me" endpoints

use axum::{
    extract::{Path, RawQuery, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vernite_core::event::Event;
use vernite_core::time_track::TimeTrack;

use super::task::{task_views, TaskView};
use super::{
    auth_error, client_info, core_error, event_window, query_pairs, CurrentUser, RouteError,
};
use crate::auth::{AccountChanges, AuthSession, Registration, SessionSummary, UserSummary};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    email: String,
    username: String,
    password: String,
    name: String,
    surname: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    date_format: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    /// E-mail or username
    #[serde(alias = "login")]
    email: String,
    password: String,
    #[serde(default)]
    remember: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditAccountRequest {
    name: Option<String>,
    surname: Option<String>,
    username: Option<String>,
    language: Option<String>,
    date_format: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}

#[derive(Debug, Deserialize)]
struct DeleteAccountRequest {
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    token: String,
    expires_at: String,
    user: UserSummary,
}

fn format_expiry(exp: usize) -> String {
    DateTime::<Utc>::from_timestamp(exp as i64, 0)
        .map(|value| value.to_rfc3339())
        .unwrap_or_else(|| Utc::now().to_rfc3339())
}

fn auth_response(state: &AppState, session: AuthSession) -> Result<AuthResponse, RouteError> {
    let token = state
        .auth_store()
        .encode_claims(&session.claims)
        .map_err(auth_error)?;
    Ok(AuthResponse {
        token,
        expires_at: format_expiry(session.claims.exp),
        user: session.user,
    })
}

async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), RouteError> {
    let session = state
        .auth_store()
        .register(
            Registration {
                email: req.email,
                username: req.username,
                password: req.password,
                name: req.name,
                surname: req.surname,
                language: req.language,
                date_format: req.date_format,
            },
            client_info(&headers),
        )
        .await
        .map_err(auth_error)?;
    Ok((StatusCode::CREATED, Json(auth_response(&state, session)?)))
}

async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, RouteError> {
    let session = state
        .auth_store()
        .login(&req.email, &req.password, req.remember, client_info(&headers))
        .await
        .map_err(auth_error)?;
    Ok(Json(auth_response(&state, session)?))
}

async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<StatusCode, RouteError> {
    state
        .auth_store()
        .logout(user.0.session_id)
        .await
        .map_err(auth_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn me(user: CurrentUser) -> Json<UserSummary> {
    Json(user.0.user)
}

async fn edit(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<EditAccountRequest>,
) -> Result<Json<UserSummary>, RouteError> {
    let updated = state
        .auth_store()
        .edit(
            user.id(),
            AccountChanges {
                name: req.name,
                surname: req.surname,
                username: req.username,
                language: req.language,
                date_format: req.date_format,
            },
        )
        .await
        .map_err(auth_error)?;
    Ok(Json(updated))
}

async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode, RouteError> {
    state
        .auth_store()
        .change_password(user.id(), &req.old_password, &req.new_password)
        .await
        .map_err(auth_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_account(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<DeleteAccountRequest>,
) -> Result<StatusCode, RouteError> {
    state
        .auth_store()
        .delete_account(user.id(), &req.password)
        .await
        .map_err(auth_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn recover_account(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<UserSummary>, RouteError> {
    let user = state
        .auth_store()
        .recover_account(&req.email, &req.password)
        .await
        .map_err(auth_error)?;
    Ok(Json(user))
}

async fn list_sessions(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Json<Vec<SessionSummary>> {
    Json(
        state
            .auth_store()
            .list_sessions(user.id(), user.0.session_id)
            .await,
    )
}

async fn revoke_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, RouteError> {
    state
        .auth_store()
        .revoke_session(user.id(), id)
        .await
        .map_err(auth_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn my_time_tracks(State(state): State<AppState>, user: CurrentUser) -> Json<Vec<TimeTrack>> {
    Json(state.tracker().user_time_tracks(user.id()).await)
}

async fn my_events(
    State(state): State<AppState>,
    user: CurrentUser,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<Event>>, RouteError> {
    let pairs = query_pairs(query.as_deref());
    let (from, to, filter) = event_window(&pairs)?;
    let events = state
        .tracker()
        .user_events(user.id(), from, to, &filter)
        .await
        .map_err(core_error)?;
    Ok(Json(events))
}

async fn my_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<TaskView>>, RouteError> {
    let tasks = state
        .tracker()
        .assigned_tasks(user.id())
        .await
        .map_err(core_error)?;
    Ok(Json(task_views(&state, tasks).await))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/me/track", get(my_time_tracks))
        .route("/api/auth/me/events", get(my_events))
        .route("/api/auth/edit", put(edit))
        .route("/api/auth/password/change", post(change_password))
        .route("/api/auth/delete", delete(delete_account))
        .route("/api/auth/delete/recover", post(recover_account))
        .route("/api/session", get(list_sessions))
        .route("/api/session/{id}", delete(revoke_session))
        .route("/api/me/tasks", get(my_tasks))
}
