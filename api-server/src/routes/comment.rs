//! Task comment routes; comments on tasks linked to an issue are mirrored

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;
use vernite_core::comment::{Comment, CommentRequest};

use super::{core_error, CurrentUser, RouteError};
use crate::state::AppState;

/// Push a comment to the linked issue; failures only log
async fn mirror(
    state: &AppState,
    user: &CurrentUser,
    project_id: Uuid,
    number: u64,
    comment: &Comment,
) {
    let Some(github) = state.github() else {
        return;
    };
    let task = match state.tracker().get_task(user.id(), project_id, number).await {
        Ok(task) => task,
        Err(err) => {
            tracing::warn!(error = %err, "task vanished before comment sync");
            return;
        }
    };
    if let Err(err) = github.mirror_comment(&task, comment).await {
        tracing::warn!(comment_id = %comment.id, error = %err, "failed to mirror comment");
    }
}

async fn list_comments(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, number)): Path<(Uuid, u64)>,
) -> Result<Json<Vec<Comment>>, RouteError> {
    let comments = state
        .tracker()
        .list_comments(user.id(), project_id, number)
        .await
        .map_err(core_error)?;
    Ok(Json(comments))
}

async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, number)): Path<(Uuid, u64)>,
    Json(req): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), RouteError> {
    let comment = state
        .tracker()
        .create_comment(user.id(), project_id, number, &req.content)
        .await
        .map_err(core_error)?;
    mirror(&state, &user, project_id, number, &comment).await;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn get_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, number, id)): Path<(Uuid, u64, Uuid)>,
) -> Result<Json<Comment>, RouteError> {
    let comment = state
        .tracker()
        .get_comment(user.id(), project_id, number, id)
        .await
        .map_err(core_error)?;
    Ok(Json(comment))
}

async fn update_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, number, id)): Path<(Uuid, u64, Uuid)>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<Comment>, RouteError> {
    let comment = state
        .tracker()
        .update_comment(user.id(), project_id, number, id, &req.content)
        .await
        .map_err(core_error)?;
    mirror(&state, &user, project_id, number, &comment).await;
    Ok(Json(comment))
}

async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((project_id, number, id)): Path<(Uuid, u64, Uuid)>,
) -> Result<StatusCode, RouteError> {
    let comment = state
        .tracker()
        .delete_comment(user.id(), project_id, number, id)
        .await
        .map_err(core_error)?;
    if let Some(github) = state.github() {
        if let Err(err) = github.forget_comment(comment.id).await {
            tracing::warn!(comment_id = %comment.id, error = %err, "failed to drop comment link");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/project/{project_id}/task/{number}/comment",
            get(list_comments).post(create_comment),
        )
        .route(
            "/api/project/{project_id}/task/{number}/comment/{id}",
            get(get_comment).put(update_comment).delete(delete_comment),
        )
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::test_support::test_app;

    #[tokio::test]
    async fn test_only_author_edits_comment() {
        let app = test_app().await;
        let owner = app.register("owner").await;
        let guest = app.register("guest").await;
        let project = app.project(&owner).await;
        app.json(
            Method::POST,
            "/api/project/member",
            Some(&owner),
            Some(json!({ "emails": ["guest"], "projects": [project] })),
        )
        .await;

        let (_, statuses) = app
            .json(
                Method::GET,
                &format!("/api/project/{}/status", project),
                Some(&owner),
                None,
            )
            .await;
        app.json(
            Method::POST,
            &format!("/api/project/{}/task", project),
            Some(&owner),
            Some(json!({ "name": "Discuss", "statusId": statuses[0]["id"] })),
        )
        .await;
        let base = format!("/api/project/{}/task/1/comment", project);

        let (status, comment) = app
            .json(
                Method::POST,
                &base,
                Some(&owner),
                Some(json!({ "content": "  First!  " })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(comment["content"], "First!");
        let uri = format!("{}/{}", base, comment["id"].as_str().unwrap());

        let (status, _) = app
            .json(
                Method::PUT,
                &uri,
                Some(&guest),
                Some(json!({ "content": "Hijacked" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, listed) = app.json(Method::GET, &base, Some(&guest), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, _) = app.json(Method::DELETE, &uri, Some(&owner), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
