use crate::auth::{AuthContext, UserResponse};
use crate::db::{self, Role};
use crate::error::AppError;
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json, Path},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

pub async fn list_users(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;

    let users: Vec<UserResponse> = db::list_users(&app_state.db)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();
    Ok(Json(users))
}

pub async fn set_role(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<RoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;

    if user_id == auth.user_id {
        return Err(AppError::InvalidRequest(
            "You cannot change your own role".into(),
        ));
    }

    if !db::set_role(&app_state.db, user_id, payload.role).await? {
        return Err(AppError::NotFound("User not found".into()));
    }

    let user = db::get_user(&app_state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    info!(%user_id, role = %user.role, changed_by = %auth.user_id, "role changed");
    Ok(Json(UserResponse::from(user)))
}
