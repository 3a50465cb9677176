use crate::config::AdminSeed;
use crate::db::{self, DbPool, Role, User};
use crate::error::{ActionResponse, AppError, is_unique_violation};
use crate::startup::AppState;
use axum::{
    async_trait,
    extract::{Extension, FromRequestParts, Json},
    http::{StatusCode, request::Parts},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use tower_sessions::Session;
use tracing::{error, info, warn};
use uuid::Uuid;

const USER_ID_KEY: &str = "user_id";

/// Who is making the request. Built fresh for every request from the session's
/// user id, so a role change takes effect on the next call.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            warn!(user_id = %self.user_id, "non-admin attempted an admin action");
            Err(AppError::admin_only())
        }
    }
}

impl From<&User> for AuthContext {
    fn from(user: &User) -> Self {
        AuthContext {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(msg.to_string()))?;

        let user_id = session
            .get::<Uuid>(USER_ID_KEY)
            .await?
            .ok_or_else(AppError::unauthenticated)?;

        let app_state = parts
            .extensions
            .get::<AppState>()
            .cloned()
            .ok_or_else(|| AppError::Internal("application state missing".into()))?;

        match db::get_user(&app_state.db, user_id).await? {
            Some(user) => Ok(AuthContext::from(&user)),
            None => {
                session.flush().await?;
                Err(AppError::unauthenticated())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

pub fn validate_credentials(username: &str, password: &str) -> Result<(), AppError> {
    let username_ok = (3..=32).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
    if !username_ok {
        return Err(AppError::InvalidRequest(
            "Username must be 3-32 characters of letters, digits, '.', '_' or '-'".into(),
        ));
    }
    if password.len() < 8 {
        return Err(AppError::InvalidRequest(
            "Password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

pub async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(e.to_string()))
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(e.to_string()))
}

async fn start_session(session: &Session, user_id: Uuid) -> Result<(), AppError> {
    session.cycle_id().await?;
    session.insert(USER_ID_KEY, user_id).await?;
    Ok(())
}

pub async fn register(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Json(payload): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = payload.username.trim().to_string();
    validate_credentials(&username, &payload.password)?;

    let password_hash = hash_password(payload.password).await?;
    let user = match db::create_user(&app_state.db, &username, &password_hash, Role::User).await {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Conflict("Username is already taken".into()));
        }
        Err(e) => return Err(e.into()),
    };

    start_session(&session, user.id).await?;
    info!(user_id = %user.id, "Registration successful");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn login(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Json(payload): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let invalid = || AppError::Unauthorized("Invalid username or password".into());

    let user = db::get_user_by_username(&app_state.db, payload.username.trim())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(payload.password, user.password_hash.clone()).await? {
        warn!(username = %user.username, "failed login");
        return Err(invalid());
    }

    start_session(&session, user.id).await?;
    info!(user_id = %user.id, "Authentication successful");

    Ok(Json(UserResponse::from(user)))
}

pub async fn logout(session: Session) -> Result<impl IntoResponse, AppError> {
    session.flush().await?;
    Ok(ActionResponse::ok("Signed out"))
}

pub async fn me(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let user = db::get_user(&app_state.db, auth.user_id)
        .await?
        .ok_or_else(AppError::unauthenticated)?;

    Ok(Json(UserResponse::from(user)))
}

/// Creates the configured admin account. An existing account with that name is
/// promoted only when its password matches the configured one.
pub async fn seed_admin(pool: &DbPool, seed: &AdminSeed) -> Result<(), AppError> {
    match db::get_user_by_username(pool, &seed.username).await? {
        Some(user) if user.role == Role::Admin => {}
        Some(user) => {
            let matches = verify_password(seed.password.clone(), user.password_hash.clone())
                .await
                .unwrap_or(false);
            if !matches {
                error!(
                    username = %seed.username,
                    "bootstrap admin name is taken by an account with another password, not promoting"
                );
                return Ok(());
            }
            db::set_role(pool, user.id, Role::Admin).await?;
            info!(username = %seed.username, "promoted bootstrap admin");
        }
        None => {
            let hash = hash_password(seed.password.clone()).await?;
            db::create_user(pool, &seed.username, &hash, Role::Admin).await?;
            info!(username = %seed.username, "created bootstrap admin");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_rules() {
        assert!(validate_credentials("alice", "correct horse").is_ok());
        assert!(validate_credentials("al", "correct horse").is_err());
        assert!(validate_credentials("alice smith", "correct horse").is_err());
        assert!(validate_credentials("alice", "short").is_err());
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let hash = hash_password("correct horse".into()).await.unwrap();
        assert!(verify_password("correct horse".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong horse".into(), hash).await.unwrap());
    }

    #[test]
    fn admin_gate() {
        let mut ctx = AuthContext {
            user_id: Uuid::new_v4(),
            username: "alice".into(),
            role: Role::User,
        };
        assert!(matches!(ctx.require_admin(), Err(AppError::Forbidden(_))));
        ctx.role = Role::Admin;
        assert!(ctx.require_admin().is_ok());
    }
}
