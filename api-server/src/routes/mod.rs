//! Route handlers
//!
//! Handlers return `Result<_, RouteError>`; domain, auth and GitHub errors
//! are mapped onto HTTP statuses here.

pub mod auth;
pub mod comment;
pub mod github;
pub mod health;
pub mod meeting;
pub mod project;
pub mod release;
pub mod sprint;
pub mod status;
pub mod task;
pub mod workspace;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use vernite_core::event::{EventFilter, EventType};
use vernite_github::{GitHubError, GitHubService};

use crate::auth::{AuthError, AuthSession, ClientInfo};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type RouteError = (StatusCode, Json<ErrorResponse>);

pub fn route_error(status: StatusCode, error: impl Into<String>) -> RouteError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

pub fn bad_request(error: impl Into<String>) -> RouteError {
    route_error(StatusCode::BAD_REQUEST, error)
}

fn core_status(err: &vernite_core::Error) -> StatusCode {
    use vernite_core::Error;
    match err {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::Conflict(_) => StatusCode::CONFLICT,
        Error::Forbidden(_) => StatusCode::FORBIDDEN,
        Error::Io(_) | Error::Serialization(_) | Error::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn core_error(err: vernite_core::Error) -> RouteError {
    let status = core_status(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "storage failure");
    }
    route_error(status, err.to_string())
}

pub fn auth_error(err: AuthError) -> RouteError {
    let status = match &err {
        AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
        AuthError::NotFound(_) => StatusCode::NOT_FOUND,
        AuthError::Conflict(_) => StatusCode::CONFLICT,
        AuthError::Storage(_) => {
            tracing::error!(error = %err, "auth storage failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    route_error(status, err.to_string())
}

pub fn github_error(err: GitHubError) -> RouteError {
    let status = match &err {
        GitHubError::Core(inner) => core_status(inner),
        GitHubError::Http(_) | GitHubError::Api { .. } => StatusCode::BAD_GATEWAY,
        GitHubError::NotConfigured(_) => StatusCode::NOT_IMPLEMENTED,
        GitHubError::NoRepositoryAccess(_) => StatusCode::NOT_FOUND,
        GitHubError::Signature => StatusCode::UNAUTHORIZED,
        GitHubError::Payload(_) => StatusCode::BAD_REQUEST,
        GitHubError::Jwt(_) => {
            tracing::error!(error = %err, "failed to sign app token");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    route_error(status, err.to_string())
}

/// The GitHub service, or 501 when the integration is not configured
pub fn github_service(state: &AppState) -> Result<&GitHubService, RouteError> {
    state.github().ok_or_else(|| {
        github_error(GitHubError::NotConfigured(
            "GitHub integration is disabled".to_string(),
        ))
    })
}

/// Caller resolved from the `Authorization: Bearer` header
pub struct CurrentUser(pub AuthSession);

impl CurrentUser {
    pub fn id(&self) -> uuid::Uuid {
        self.0.user.id
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = RouteError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| route_error(StatusCode::UNAUTHORIZED, "Missing bearer token"))?;
        let session = state
            .auth_store()
            .authorize_bearer(token)
            .await
            .map_err(auth_error)?;
        Ok(Self(session))
    }
}

pub fn client_info(headers: &HeaderMap) -> ClientInfo {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    ClientInfo {
        ip: header_value("x-forwarded-for")
            .and_then(|value| value.split(',').next().map(|ip| ip.trim().to_string())),
        user_agent: header_value("user-agent"),
    }
}

/// Decoded `key=value` pairs of a query string, keeping repeated keys
pub fn query_pairs(raw: Option<&str>) -> Vec<(String, String)> {
    let decode = |value: &str| {
        let value = value.replace('+', " ");
        let decoded = urlencoding::decode(&value).map(|decoded| decoded.into_owned());
        decoded.unwrap_or(value)
    };
    raw.unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode(key), decode(value)),
            None => (decode(pair), String::new()),
        })
        .collect()
}

/// Every value of `key`, splitting comma separated lists
pub fn query_values<'a>(
    pairs: &'a [(String, String)],
    key: &'a str,
) -> impl Iterator<Item = &'a str> {
    pairs
        .iter()
        .filter(move |(name, _)| name == key)
        .flat_map(|(_, value)| value.split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub fn query_value<'a>(pairs: &'a [(String, String)], key: &'a str) -> Option<&'a str> {
    query_values(pairs, key).next()
}

pub fn parse_query<T: std::str::FromStr>(
    pairs: &[(String, String)],
    key: &str,
) -> Result<Option<T>, RouteError> {
    query_value(pairs, key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| bad_request(format!("invalid value '{}' for {}", value, key)))
        })
        .transpose()
}

/// `from`/`to` (epoch milliseconds) plus an event filter
pub fn event_window(
    pairs: &[(String, String)],
) -> Result<(DateTime<Utc>, DateTime<Utc>, EventFilter), RouteError> {
    let millis = |key: &str| -> Result<DateTime<Utc>, RouteError> {
        let value = parse_query::<i64>(pairs, key)?
            .ok_or_else(|| bad_request(format!("{} must be specified", key)))?;
        DateTime::<Utc>::from_timestamp_millis(value)
            .ok_or_else(|| bad_request(format!("{} is out of range", key)))
    };
    let from = millis("from")?;
    let to = millis("to")?;

    let types = query_values(pairs, "type")
        .map(|value| {
            EventType::parse(value)
                .ok_or_else(|| bad_request(format!("unknown event type '{}'", value)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let filter = EventFilter {
        show_ended: parse_query::<bool>(pairs, "showEnded")?.unwrap_or(true),
        types,
    };
    Ok((from, to, filter))
}

/// Every route of the API
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(workspace::router())
        .merge(project::router())
        .merge(status::router())
        .merge(task::router())
        .merge(comment::router())
        .merge(sprint::router())
        .merge(release::router())
        .merge(meeting::router())
        .merge(github::router())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_keep_repeated_keys() {
        let pairs = query_pairs(Some("statusId=a&statusId=b,c&name=Big+bang%21&flag"));
        let values: Vec<&str> = query_values(&pairs, "statusId").collect();
        assert_eq!(values, vec!["a", "b", "c"]);
        assert_eq!(query_value(&pairs, "name"), Some("Big bang!"));
        assert_eq!(query_value(&pairs, "flag"), None);
    }

    #[test]
    fn test_error_mapping() {
        let (status, _) = core_error(vernite_core::Error::Conflict("busy".to_string()));
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = github_error(GitHubError::Api {
            status: 500,
            message: "boom".to_string(),
        });
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, _) = github_error(GitHubError::Core(vernite_core::Error::NotFound(
            "Project".to_string(),
        )));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = auth_error(AuthError::Unauthorized("nope".to_string()));
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
