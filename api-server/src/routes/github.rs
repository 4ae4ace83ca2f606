//! GitHub account linking, project integrations and the webhook endpoint

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Redirect,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vernite_core::git::Repository;
use vernite_github::model::{GitHubAccount, ProjectIntegration};

use super::{github_error, github_service, CurrentUser, RouteError};
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "x-hub-signature-256";
const EVENT_HEADER: &str = "x-github-event";

#[derive(Debug, Serialize)]
struct AuthorizeResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    #[serde(default)]
    code: String,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntegrationRequest {
    full_name: String,
}

async fn authorize(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<AuthorizeResponse>, RouteError> {
    let github = github_service(&state)?;
    let url = github.authorization_url(user.id()).await;
    Ok(Json(AuthorizeResponse { url }))
}

/// GitHub redirects the browser here; the outcome is handed to the frontend
/// as a query flag.
async fn authorize_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    let outcome = match state.github() {
        Some(github) => github.complete_authorization(&query.code, &query.state).await,
        None => {
            return Redirect::to("/?path=/github&status=error");
        }
    };
    match outcome {
        Ok(account) => {
            tracing::debug!(login = %account.login, "GitHub authorization completed");
            Redirect::to("/?path=/github&status=success")
        }
        Err(err) => {
            tracing::warn!(error = %err, "GitHub authorization failed");
            Redirect::to("/?path=/github&status=error")
        }
    }
}

async fn list_accounts(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Json<Vec<GitHubAccount>> {
    match state.github() {
        Some(github) => Json(github.list_authorizations(user.id()).await),
        None => Json(Vec::new()),
    }
}

async fn delete_account(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<StatusCode, RouteError> {
    github_service(&state)?
        .delete_authorization(user.id(), id)
        .await
        .map_err(github_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn repositories(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Repository>>, RouteError> {
    let repositories = github_service(&state)?
        .user_repositories(user.id())
        .await
        .map_err(github_error)?;
    Ok(Json(repositories))
}

async fn create_integration(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<Uuid>,
    Json(req): Json<IntegrationRequest>,
) -> Result<(StatusCode, Json<ProjectIntegration>), RouteError> {
    let integration = github_service(&state)?
        .create_project_integration(user.id(), project_id, &req.full_name)
        .await
        .map_err(github_error)?;
    Ok((StatusCode::CREATED, Json(integration)))
}

async fn delete_integration(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, RouteError> {
    github_service(&state)?
        .delete_project_integration(user.id(), project_id, id)
        .await
        .map_err(github_error)?;
    Ok(StatusCode::NO_CONTENT)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// POST /api/webhook/github - signed delivery from the GitHub App
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, RouteError> {
    let github = github_service(&state)?;
    let event = header_str(&headers, EVENT_HEADER).unwrap_or_default();
    github
        .handle_webhook(event, &body, header_str(&headers, SIGNATURE_HEADER))
        .await
        .map_err(github_error)?;
    Ok(StatusCode::OK)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/user/integration/git/github", get(list_accounts))
        .route("/api/user/integration/git/github/authorize", get(authorize))
        .route(
            "/api/user/integration/git/github/authorize_callback",
            get(authorize_callback),
        )
        .route(
            "/api/user/integration/git/github/repository",
            get(repositories),
        )
        .route(
            "/api/user/integration/git/github/{id}",
            delete(delete_account),
        )
        .route(
            "/api/project/{project_id}/integration/git/github",
            post(create_integration),
        )
        .route(
            "/api/project/{project_id}/integration/git/github/{id}",
            delete(delete_integration),
        )
        .route("/api/webhook/github", post(webhook))
}
