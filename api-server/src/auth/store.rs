use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::{env_parse, env_string};

const DEFAULT_JWT_SECRET: &str = "dev-jwt-secret-change-me";
const DEFAULT_TOKEN_TTL_SECONDS: i64 = 60 * 60 * 8;
const REMEMBER_TTL_SECONDS: i64 = 60 * 60 * 24 * 30;
const RECOVERY_WINDOW_DAYS: i64 = 7;
/// `last_used` is written back at most this often per session
const LAST_USED_RESOLUTION_SECONDS: i64 = 60;

const USERNAME_MAX: usize = 50;
const PERSON_NAME_MAX: usize = 100;
const LANGUAGE_MAX: usize = 5;
const DATE_FORMAT_MAX: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    pub sub: String,
    /// Session id; revoking the session invalidates the token
    pub sid: String,
    pub exp: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub name: String,
    pub surname: String,
    pub language: Option<String>,
    pub date_format: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub remembered: bool,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    pub current: bool,
}

/// Request metadata recorded on a new session
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub claims: AuthClaims,
    pub session_id: Uuid,
    pub user: UserSummary,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
    pub name: String,
    pub surname: String,
    pub language: Option<String>,
    pub date_format: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub username: Option<String>,
    pub language: Option<String>,
    pub date_format: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    id: Uuid,
    email: String,
    username: String,
    name: String,
    surname: String,
    password_hash: String,
    language: Option<String>,
    date_format: Option<String>,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl User {
    fn matches_login(&self, login: &str) -> bool {
        let login = login.trim();
        self.email == login.to_lowercase() || self.username.eq_ignore_ascii_case(login)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Session {
    id: Uuid,
    user_id: Uuid,
    ip: Option<String>,
    user_agent: Option<String>,
    remembered: bool,
    created_at: DateTime<Utc>,
    last_used: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
struct AuthState {
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, Session>,
}

impl AuthState {
    fn user_by_login(&self, login: &str) -> Option<&User> {
        self.users.values().find(|user| user.matches_login(login))
    }

    fn revoke_sessions(&mut self, user_id: Uuid, now: DateTime<Utc>) {
        for session in self.sessions.values_mut() {
            if session.user_id == user_id && session.revoked_at.is_none() {
                session.revoked_at = Some(now);
            }
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredAuthState {
    users: Vec<User>,
    sessions: Vec<Session>,
}

impl From<StoredAuthState> for AuthState {
    fn from(value: StoredAuthState) -> Self {
        Self {
            users: value
                .users
                .into_iter()
                .map(|item| (item.id, item))
                .collect(),
            sessions: value
                .sessions
                .into_iter()
                .map(|item| (item.id, item))
                .collect(),
        }
    }
}

impl From<&AuthState> for StoredAuthState {
    fn from(value: &AuthState) -> Self {
        Self {
            users: value.users.values().cloned().collect(),
            sessions: value.sessions.values().cloned().collect(),
        }
    }
}

#[derive(Clone)]
pub struct AuthStore {
    state: Arc<RwLock<AuthState>>,
    file_path: PathBuf,
    jwt_secret: String,
    token_ttl_seconds: i64,
}

impl AuthStore {
    pub async fn new(base_dir: PathBuf) -> Result<Self, AuthError> {
        tokio::fs::create_dir_all(&base_dir).await.map_err(|err| {
            AuthError::Storage(format!("Failed to create auth directory: {}", err))
        })?;

        let file_path = base_dir.join("state.json");
        let state = load_state(&file_path).await?;
        let jwt_secret = env_string("VERNITE_AUTH_JWT_SECRET")
            .unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string());
        let token_ttl_seconds = env_parse::<i64>("VERNITE_AUTH_TOKEN_TTL_SECONDS")
            .filter(|ttl| *ttl > 0)
            .unwrap_or(DEFAULT_TOKEN_TTL_SECONDS);

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            file_path,
            jwt_secret,
            token_ttl_seconds,
        })
    }

    /// Apply `change` to a copy of the state and swap it in once persisted
    async fn commit<R>(
        &self,
        change: impl FnOnce(&mut AuthState) -> Result<R, AuthError>,
    ) -> Result<R, AuthError> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let result = change(&mut next)?;
        persist_state(&self.file_path, &next).await?;
        *state = next;
        Ok(result)
    }

    pub async fn register(
        &self,
        registration: Registration,
        client: ClientInfo,
    ) -> Result<AuthSession, AuthError> {
        let email = normalize_email(&registration.email)?;
        let username = normalize_username(&registration.username)?;
        validate_password(&registration.password)?;
        let name = required_text("name", &registration.name, PERSON_NAME_MAX)?;
        let surname = required_text("surname", &registration.surname, PERSON_NAME_MAX)?;
        let language = optional_text("language", registration.language, LANGUAGE_MAX)?;
        let date_format = optional_text("dateFormat", registration.date_format, DATE_FORMAT_MAX)?;

        let user = User {
            id: Uuid::new_v4(),
            email,
            username,
            name,
            surname,
            password_hash: hash_password(&registration.password),
            language,
            date_format,
            created_at: Utc::now(),
            deleted_at: None,
        };
        let session = new_session(user.id, false, client);

        self.commit(|state| {
            if state.users.values().any(|other| other.email == user.email) {
                return Err(AuthError::Conflict("email is already taken".to_string()));
            }
            if state
                .users
                .values()
                .any(|other| other.username.eq_ignore_ascii_case(&user.username))
            {
                return Err(AuthError::Conflict("username is already taken".to_string()));
            }
            state.users.insert(user.id, user.clone());
            state.sessions.insert(session.id, session.clone());
            Ok(())
        })
        .await?;

        tracing::info!(user_id = %user.id, "user registered");
        self.build_session(&user, &session)
    }

    /// Log in with an e-mail or username
    pub async fn login(
        &self,
        login: &str,
        password: &str,
        remember: bool,
        client: ClientInfo,
    ) -> Result<AuthSession, AuthError> {
        let user = {
            let state = self.state.read().await;
            state
                .user_by_login(login)
                .cloned()
                .ok_or_else(|| AuthError::Unauthorized("Invalid credentials".to_string()))?
        };
        if !verify_password(&user.password_hash, password) {
            return Err(AuthError::Unauthorized("Invalid credentials".to_string()));
        }
        if user.deleted_at.is_some() {
            return Err(AuthError::Forbidden("account deleted".to_string()));
        }

        let session = new_session(user.id, remember, client);
        self.commit(|state| {
            state.sessions.insert(session.id, session.clone());
            Ok(())
        })
        .await?;

        tracing::debug!(user_id = %user.id, session_id = %session.id, "session opened");
        self.build_session(&user, &session)
    }

    pub async fn logout(&self, session_id: Uuid) -> Result<(), AuthError> {
        self.commit(|state| {
            let session = state
                .sessions
                .get_mut(&session_id)
                .ok_or_else(|| AuthError::NotFound("Session not found".to_string()))?;
            session.revoked_at.get_or_insert_with(Utc::now);
            Ok(())
        })
        .await
    }

    pub async fn authorize_bearer(&self, token: &str) -> Result<AuthSession, AuthError> {
        let claims = self.decode_claims(token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError::Unauthorized("Invalid token subject".to_string()))?;
        let session_id = Uuid::parse_str(&claims.sid)
            .map_err(|_| AuthError::Unauthorized("Invalid token session".to_string()))?;

        let (user, session) = {
            let state = self.state.read().await;
            let session = state
                .sessions
                .get(&session_id)
                .filter(|session| session.user_id == user_id && session.revoked_at.is_none())
                .cloned()
                .ok_or_else(|| AuthError::Unauthorized("Session not found".to_string()))?;
            let user = state
                .users
                .get(&user_id)
                .filter(|user| user.deleted_at.is_none())
                .cloned()
                .ok_or_else(|| AuthError::Unauthorized("User not found".to_string()))?;
            (user, session)
        };

        let now = Utc::now();
        if now - session.last_used >= Duration::seconds(LAST_USED_RESOLUTION_SECONDS) {
            self.commit(|state| {
                if let Some(session) = state.sessions.get_mut(&session_id) {
                    session.last_used = now;
                }
                Ok(())
            })
            .await?;
        }

        Ok(AuthSession {
            claims,
            session_id,
            user: user_to_summary(&user),
        })
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<UserSummary, AuthError> {
        let state = self.state.read().await;
        state
            .users
            .get(&user_id)
            .map(user_to_summary)
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))
    }

    pub async fn edit(
        &self,
        user_id: Uuid,
        changes: AccountChanges,
    ) -> Result<UserSummary, AuthError> {
        let name = changes
            .name
            .map(|name| required_text("name", &name, PERSON_NAME_MAX))
            .transpose()?;
        let surname = changes
            .surname
            .map(|surname| required_text("surname", &surname, PERSON_NAME_MAX))
            .transpose()?;
        let username = changes
            .username
            .map(|username| normalize_username(&username))
            .transpose()?;
        let language = optional_text("language", changes.language, LANGUAGE_MAX)?;
        let date_format = optional_text("dateFormat", changes.date_format, DATE_FORMAT_MAX)?;

        self.commit(|state| {
            if let Some(username) = &username {
                if state
                    .users
                    .values()
                    .any(|other| other.id != user_id && other.username.eq_ignore_ascii_case(username))
                {
                    return Err(AuthError::Conflict("username is already taken".to_string()));
                }
            }
            let user = state
                .users
                .get_mut(&user_id)
                .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;
            if let Some(name) = name {
                user.name = name;
            }
            if let Some(surname) = surname {
                user.surname = surname;
            }
            if let Some(username) = username {
                user.username = username;
            }
            if language.is_some() {
                user.language = language;
            }
            if date_format.is_some() {
                user.date_format = date_format;
            }
            Ok(user_to_summary(user))
        })
        .await
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validate_password(new_password)?;
        let password_hash = hash_password(new_password);
        self.commit(|state| {
            let user = state
                .users
                .get_mut(&user_id)
                .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;
            if !verify_password(&user.password_hash, old_password) {
                return Err(AuthError::Unauthorized("Invalid old password".to_string()));
            }
            user.password_hash = password_hash;
            Ok(())
        })
        .await
    }

    /// Soft delete; every session of the user is revoked
    pub async fn delete_account(&self, user_id: Uuid, password: &str) -> Result<(), AuthError> {
        self.commit(|state| {
            let now = Utc::now();
            let user = state
                .users
                .get_mut(&user_id)
                .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;
            if !verify_password(&user.password_hash, password) {
                return Err(AuthError::Unauthorized("Invalid password".to_string()));
            }
            user.deleted_at = Some(now);
            state.revoke_sessions(user_id, now);
            Ok(())
        })
        .await?;
        tracing::info!(user_id = %user_id, "account deleted");
        Ok(())
    }

    pub async fn recover_account(
        &self,
        login: &str,
        password: &str,
    ) -> Result<UserSummary, AuthError> {
        let user = self
            .commit(|state| {
                let id = state
                    .user_by_login(login)
                    .map(|user| user.id)
                    .ok_or_else(|| AuthError::Unauthorized("Invalid credentials".to_string()))?;
                let user = state
                    .users
                    .get_mut(&id)
                    .ok_or_else(|| AuthError::Unauthorized("Invalid credentials".to_string()))?;
                if !verify_password(&user.password_hash, password) {
                    return Err(AuthError::Unauthorized("Invalid credentials".to_string()));
                }
                let deleted_at = user
                    .deleted_at
                    .ok_or_else(|| AuthError::InvalidInput("account is not deleted".to_string()))?;
                if Utc::now() - deleted_at > Duration::days(RECOVERY_WINDOW_DAYS) {
                    return Err(AuthError::Forbidden(
                        "account can no longer be recovered".to_string(),
                    ));
                }
                user.deleted_at = None;
                Ok(user_to_summary(user))
            })
            .await?;
        tracing::info!(user_id = %user.id, "account recovered");
        Ok(user)
    }

    /// Active sessions of a user, newest first
    pub async fn list_sessions(&self, user_id: Uuid, current: Uuid) -> Vec<SessionSummary> {
        let state = self.state.read().await;
        let mut sessions: Vec<SessionSummary> = state
            .sessions
            .values()
            .filter(|session| session.user_id == user_id && session.revoked_at.is_none())
            .map(|session| session_to_summary(session, current))
            .collect();
        sessions.sort_by(|a, b| b.last_used.cmp(&a.last_used));
        sessions
    }

    pub async fn revoke_session(&self, user_id: Uuid, session_id: Uuid) -> Result<(), AuthError> {
        self.commit(|state| {
            let session = state
                .sessions
                .get_mut(&session_id)
                .filter(|session| session.user_id == user_id && session.revoked_at.is_none())
                .ok_or_else(|| AuthError::NotFound("Session not found".to_string()))?;
            session.revoked_at = Some(Utc::now());
            Ok(())
        })
        .await
    }

    /// Live users matching any of the given e-mails or usernames
    pub async fn find_by_logins(&self, logins: &[String]) -> Vec<UserSummary> {
        let state = self.state.read().await;
        let mut users: Vec<UserSummary> = state
            .users
            .values()
            .filter(|user| user.deleted_at.is_none())
            .filter(|user| logins.iter().any(|login| user.matches_login(login)))
            .map(user_to_summary)
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users
    }

    pub async fn get_users(&self, ids: &[Uuid]) -> HashMap<Uuid, UserSummary> {
        let state = self.state.read().await;
        ids.iter()
            .filter_map(|id| state.users.get(id))
            .map(|user| (user.id, user_to_summary(user)))
            .collect()
    }

    fn build_session(&self, user: &User, session: &Session) -> Result<AuthSession, AuthError> {
        let ttl = if session.remembered {
            REMEMBER_TTL_SECONDS
        } else {
            self.token_ttl_seconds
        };
        let claims = issue_claims(user.id, session.id, ttl)?;
        Ok(AuthSession {
            claims,
            session_id: session.id,
            user: user_to_summary(user),
        })
    }

    pub fn encode_claims(&self, claims: &AuthClaims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|err| AuthError::Storage(format!("Failed to encode JWT: {}", err)))
    }

    pub fn decode_claims(&self, token: &str) -> Result<AuthClaims, AuthError> {
        let decoded = decode::<AuthClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|err| AuthError::Unauthorized(format!("Invalid token: {}", err)))?;
        Ok(decoded.claims)
    }
}

fn issue_claims(user_id: Uuid, session_id: Uuid, ttl_seconds: i64) -> Result<AuthClaims, AuthError> {
    let exp = (Utc::now() + Duration::seconds(ttl_seconds)).timestamp();
    let exp = usize::try_from(exp)
        .map_err(|_| AuthError::Storage("Failed to encode token expiration".to_string()))?;

    Ok(AuthClaims {
        sub: user_id.to_string(),
        sid: session_id.to_string(),
        exp,
    })
}

fn new_session(user_id: Uuid, remembered: bool, client: ClientInfo) -> Session {
    let now = Utc::now();
    Session {
        id: Uuid::new_v4(),
        user_id,
        ip: sanitize_optional_string(client.ip),
        user_agent: sanitize_optional_string(client.user_agent),
        remembered,
        created_at: now,
        last_used: now,
        revoked_at: None,
    }
}

fn user_to_summary(user: &User) -> UserSummary {
    UserSummary {
        id: user.id,
        email: user.email.clone(),
        username: user.username.clone(),
        name: user.name.clone(),
        surname: user.surname.clone(),
        language: user.language.clone(),
        date_format: user.date_format.clone(),
        created_at: user.created_at,
        deleted_at: user.deleted_at,
    }
}

fn session_to_summary(session: &Session, current: Uuid) -> SessionSummary {
    SessionSummary {
        id: session.id,
        ip: session.ip.clone(),
        user_agent: session.user_agent.clone(),
        remembered: session.remembered,
        created_at: session.created_at,
        last_used: session.last_used,
        current: session.id == current,
    }
}

async fn load_state(path: &Path) -> Result<AuthState, AuthError> {
    if !path.exists() {
        return Ok(AuthState::default());
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| AuthError::Storage(format!("Failed to read auth state: {}", err)))?;
    if content.trim().is_empty() {
        return Ok(AuthState::default());
    }
    let stored: StoredAuthState = serde_json::from_str(&content)
        .map_err(|err| AuthError::Storage(format!("Failed to parse auth state: {}", err)))?;
    Ok(stored.into())
}

async fn persist_state(path: &Path, state: &AuthState) -> Result<(), AuthError> {
    let content = serde_json::to_string_pretty(&StoredAuthState::from(state))
        .map_err(|err| AuthError::Storage(format!("Failed to serialize auth state: {}", err)))?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|err| {
            AuthError::Storage(format!("Failed to create auth parent dir: {}", err))
        })?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, content)
        .await
        .map_err(|err| AuthError::Storage(format!("Failed to write auth state: {}", err)))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|err| AuthError::Storage(format!("Failed to replace auth state: {}", err)))?;
    Ok(())
}

fn sanitize_optional_string(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn required_text(field: &str, value: &str, max: usize) -> Result<String, AuthError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().count() > max {
        return Err(AuthError::InvalidInput(format!(
            "{} must be between 1 and {} characters",
            field, max
        )));
    }
    Ok(trimmed.to_string())
}

fn optional_text(field: &str, value: Option<String>, max: usize) -> Result<Option<String>, AuthError> {
    let value = sanitize_optional_string(value);
    if value.as_ref().is_some_and(|value| value.chars().count() > max) {
        return Err(AuthError::InvalidInput(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(value)
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() || !normalized.contains('@') {
        return Err(AuthError::InvalidInput("Invalid email".to_string()));
    }
    Ok(normalized)
}

fn normalize_username(username: &str) -> Result<String, AuthError> {
    let username = required_text("username", username, USERNAME_MAX)?;
    if !username
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'))
    {
        return Err(AuthError::InvalidInput(
            "username may only contain letters, digits, '_', '.' and '-'".to_string(),
        ));
    }
    Ok(username)
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < 8 {
        return Err(AuthError::InvalidInput(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

fn hash_password(password: &str) -> String {
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();

    format!(
        "v1${}${}",
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(digest)
    )
}

fn verify_password(stored_hash: &str, password: &str) -> bool {
    let mut parts = stored_hash.split('$');
    let (Some("v1"), Some(encoded_salt), Some(encoded_digest)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    let Ok(salt) = URL_SAFE_NO_PAD.decode(encoded_salt) else {
        return false;
    };
    let Ok(expected_digest) = URL_SAFE_NO_PAD.decode(encoded_digest) else {
        return false;
    };

    let mut hasher = Sha256::new();
    hasher.update(&salt);
    hasher.update(password.as_bytes());
    let actual_digest = hasher.finalize();
    expected_digest == actual_digest.as_slice()
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    async fn build_store() -> (AuthStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = AuthStore::new(temp_dir.path().join("auth")).await.unwrap();
        (store, temp_dir)
    }

    fn registration(email: &str, username: &str) -> Registration {
        Registration {
            email: email.to_string(),
            username: username.to_string(),
            password: "verysecurepw".to_string(),
            name: "Ada".to_string(),
            surname: "Lovelace".to_string(),
            language: None,
            date_format: None,
        }
    }

    #[tokio::test]
    async fn register_and_login_roundtrip() {
        let (store, _temp_dir) = build_store().await;
        let session = store
            .register(registration(" Ada@Example.com ", "ada"), ClientInfo::default())
            .await
            .unwrap();
        assert_eq!(session.user.email, "ada@example.com");

        let token = store.encode_claims(&session.claims).unwrap();
        let authed = store.authorize_bearer(&token).await.unwrap();
        assert_eq!(authed.user.id, session.user.id);
        assert_eq!(authed.session_id, session.session_id);

        let by_username = store
            .login("ADA", "verysecurepw", false, ClientInfo::default())
            .await
            .unwrap();
        assert_ne!(by_username.session_id, session.session_id);
        assert!(matches!(
            store
                .login("ada@example.com", "wrong-password", false, ClientInfo::default())
                .await,
            Err(AuthError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn register_rejects_taken_identity_and_bad_input() {
        let (store, _temp_dir) = build_store().await;
        store
            .register(registration("ada@example.com", "ada"), ClientInfo::default())
            .await
            .unwrap();

        assert!(matches!(
            store
                .register(registration("ADA@example.com", "other"), ClientInfo::default())
                .await,
            Err(AuthError::Conflict(_))
        ));
        assert!(matches!(
            store
                .register(registration("new@example.com", "Ada"), ClientInfo::default())
                .await,
            Err(AuthError::Conflict(_))
        ));
        assert!(matches!(
            store
                .register(registration("new@example.com", "bad name"), ClientInfo::default())
                .await,
            Err(AuthError::InvalidInput(_))
        ));

        let mut short = registration("short@example.com", "short");
        short.password = "short".to_string();
        assert!(matches!(
            store.register(short, ClientInfo::default()).await,
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn logout_and_revoke_invalidate_tokens() {
        let (store, _temp_dir) = build_store().await;
        let first = store
            .register(registration("ada@example.com", "ada"), ClientInfo::default())
            .await
            .unwrap();
        let second = store
            .login(
                "ada",
                "verysecurepw",
                true,
                ClientInfo {
                    ip: Some("10.0.0.1".to_string()),
                    user_agent: Some("curl".to_string()),
                },
            )
            .await
            .unwrap();

        let sessions = store
            .list_sessions(first.user.id, first.session_id)
            .await;
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions.iter().filter(|s| s.current).count(), 1);
        assert!(sessions.iter().any(|s| s.remembered && s.ip.as_deref() == Some("10.0.0.1")));

        store
            .revoke_session(first.user.id, second.session_id)
            .await
            .unwrap();
        let token = store.encode_claims(&second.claims).unwrap();
        assert!(store.authorize_bearer(&token).await.is_err());
        assert!(matches!(
            store.revoke_session(Uuid::new_v4(), first.session_id).await,
            Err(AuthError::NotFound(_))
        ));

        store.logout(first.session_id).await.unwrap();
        let token = store.encode_claims(&first.claims).unwrap();
        assert!(store.authorize_bearer(&token).await.is_err());
    }

    #[tokio::test]
    async fn deleted_account_can_be_recovered() {
        let (store, temp_dir) = build_store().await;
        let session = store
            .register(registration("ada@example.com", "ada"), ClientInfo::default())
            .await
            .unwrap();
        let user_id = session.user.id;

        assert!(matches!(
            store.delete_account(user_id, "wrong-password").await,
            Err(AuthError::Unauthorized(_))
        ));
        store.delete_account(user_id, "verysecurepw").await.unwrap();

        let token = store.encode_claims(&session.claims).unwrap();
        assert!(store.authorize_bearer(&token).await.is_err());
        assert!(matches!(
            store
                .login("ada", "verysecurepw", false, ClientInfo::default())
                .await,
            Err(AuthError::Forbidden(_))
        ));
        assert!(store.find_by_logins(&["ada".to_string()]).await.is_empty());

        let recovered = store.recover_account("ada", "verysecurepw").await.unwrap();
        assert!(recovered.deleted_at.is_none());

        let reopened = AuthStore::new(temp_dir.path().join("auth")).await.unwrap();
        assert!(reopened
            .login("ada", "verysecurepw", false, ClientInfo::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn account_deleted_too_long_ago_stays_deleted() {
        let (store, _temp_dir) = build_store().await;
        let session = store
            .register(registration("ada@example.com", "ada"), ClientInfo::default())
            .await
            .unwrap();
        let user_id = session.user.id;
        store.delete_account(user_id, "verysecurepw").await.unwrap();

        store
            .commit(|state| {
                let user = state.users.get_mut(&user_id).unwrap();
                user.deleted_at = Some(Utc::now() - Duration::days(RECOVERY_WINDOW_DAYS + 1));
                Ok(())
            })
            .await
            .unwrap();

        assert!(matches!(
            store.recover_account("ada", "verysecurepw").await,
            Err(AuthError::Forbidden(_))
        ));
        assert!(store.state.read().await.users[&user_id].deleted_at.is_some());
        assert!(matches!(
            store
                .login("ada", "verysecurepw", false, ClientInfo::default())
                .await,
            Err(AuthError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn edit_and_change_password() {
        let (store, _temp_dir) = build_store().await;
        let ada = store
            .register(registration("ada@example.com", "ada"), ClientInfo::default())
            .await
            .unwrap();
        store
            .register(registration("bob@example.com", "bob"), ClientInfo::default())
            .await
            .unwrap();

        let edited = store
            .edit(
                ada.user.id,
                AccountChanges {
                    name: Some(" Augusta ".to_string()),
                    language: Some("pl".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.name, "Augusta");
        assert_eq!(edited.language.as_deref(), Some("pl"));

        assert!(matches!(
            store
                .edit(
                    ada.user.id,
                    AccountChanges {
                        username: Some("BOB".to_string()),
                        ..Default::default()
                    },
                )
                .await,
            Err(AuthError::Conflict(_))
        ));

        assert!(matches!(
            store
                .change_password(ada.user.id, "not-the-password", "anothersecret")
                .await,
            Err(AuthError::Unauthorized(_))
        ));
        store
            .change_password(ada.user.id, "verysecurepw", "anothersecret")
            .await
            .unwrap();
        assert!(store
            .login("ada", "anothersecret", false, ClientInfo::default())
            .await
            .is_ok());
    }
}
