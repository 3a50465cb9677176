use crate::auth::AuthContext;
use crate::db::{self, ClubChanges};
use crate::error::{ActionResponse, AppError, is_unique_violation};
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateClubRequest {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub positions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateClubRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub positions: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ClubResponse {
    #[serde(flatten)]
    pub club: db::Club,
    pub is_member: bool,
}

/// Trims, drops blanks and removes duplicates while keeping first-seen order.
pub fn normalize_positions(positions: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(positions.len());
    for position in positions {
        let position = position.trim().to_string();
        if !position.is_empty() && !seen.contains(&position) {
            seen.push(position);
        }
    }
    seen
}

fn club_name_taken() -> AppError {
    AppError::Conflict("A club with this name already exists".into())
}

pub async fn create_club(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Json(payload): Json<CreateClubRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidRequest("Club name is required".into()));
    }
    let positions = normalize_positions(payload.positions);

    let club = db::create_club(
        &app_state.db,
        auth.user_id,
        name,
        payload.description.as_deref(),
        payload.image_url.as_deref(),
        &positions,
    )
    .await
    .map_err(|e| if is_unique_violation(&e) { club_name_taken() } else { e.into() })?;

    info!(club_id = %club.id, name = %club.name, "club created");
    Ok((StatusCode::CREATED, Json(club)))
}

pub async fn list_clubs(
    Extension(app_state): Extension<AppState>,
    _auth: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let clubs = db::list_clubs(&app_state.db).await?;
    Ok(Json(clubs))
}

pub async fn get_club(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(club_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let club = db::get_club(&app_state.db, club_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Club not found".into()))?;
    let is_member = db::is_member(&app_state.db, club_id, auth.user_id).await?;

    Ok(Json(ClubResponse { club, is_member }))
}

pub async fn update_club(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(club_id): Path<Uuid>,
    Json(payload): Json<UpdateClubRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;

    let name = payload.name.as_deref().map(str::trim);
    if name == Some("") {
        return Err(AppError::InvalidRequest("Club name cannot be empty".into()));
    }
    let positions = payload.positions.map(normalize_positions);

    let changes = ClubChanges {
        name,
        description: payload.description.as_deref().map(str::trim),
        image_url: payload.image_url.as_deref().map(str::trim),
        positions: positions.as_deref(),
    };

    let club = db::update_club(&app_state.db, club_id, changes)
        .await
        .map_err(|e| if is_unique_violation(&e) { club_name_taken() } else { e.into() })?
        .ok_or_else(|| AppError::NotFound("Club not found".into()))?;

    info!(club_id = %club.id, "club updated");
    Ok(Json(club))
}

pub async fn delete_club(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(club_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;

    if !db::delete_club(&app_state.db, club_id).await? {
        return Err(AppError::NotFound("Club not found".into()));
    }

    info!(%club_id, "club deleted");
    Ok(ActionResponse::ok("Club deleted"))
}

pub async fn list_members(
    Extension(app_state): Extension<AppState>,
    _auth: AuthContext,
    Path(club_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    db::get_club(&app_state.db, club_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Club not found".into()))?;

    let members = db::list_members(&app_state.db, club_id).await?;
    Ok(Json(members))
}

pub async fn join_club(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(club_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    db::get_club(&app_state.db, club_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Club not found".into()))?;

    if !db::add_member(&app_state.db, club_id, auth.user_id).await? {
        return Err(AppError::Conflict(
            "You are already a member of this club".into(),
        ));
    }

    info!(%club_id, user_id = %auth.user_id, "member joined");
    Ok(ActionResponse::ok("Joined club"))
}

pub async fn leave_club(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(club_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !db::remove_member(&app_state.db, club_id, auth.user_id).await? {
        return Err(AppError::NotFound(
            "You are not a member of this club".into(),
        ));
    }

    info!(%club_id, user_id = %auth.user_id, "member left");
    Ok(ActionResponse::ok("Left club"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_trimmed_and_deduplicated() {
        let positions = normalize_positions(vec![
            " President ".into(),
            "Treasurer".into(),
            "".into(),
            "President".into(),
            "   ".into(),
        ]);
        assert_eq!(positions, vec!["President", "Treasurer"]);
    }
}
