use crate::auth::AuthContext;
use crate::db::{self, NominationStatus};
use crate::error::{ActionResponse, AppError, is_unique_violation};
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::types::chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateNominationRequest {
    pub club_id: Uuid,
    pub position: String,
    pub title: String,
    pub description: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct NominationFilter {
    pub club_id: Option<Uuid>,
    pub status: Option<NominationStatus>,
}

#[derive(Debug, Deserialize)]
pub struct NominationStatusRequest {
    pub status: NominationStatus,
}

fn active_exists(position: &str) -> AppError {
    AppError::Conflict(format!("An active nomination for {position} already exists"))
}

/// Storage errors from writes that can make a nomination ACTIVE. The partial
/// unique index allows one ACTIVE nomination per club position.
fn map_active_conflict(e: sqlx::Error, position: &str) -> AppError {
    if is_unique_violation(&e) {
        active_exists(position)
    } else {
        e.into()
    }
}

pub(crate) async fn load_nomination(
    app_state: &AppState,
    nomination_id: Uuid,
) -> Result<db::Nomination, AppError> {
    db::get_nomination(&app_state.db, nomination_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Nomination not found".into()))
}

pub async fn create_nomination(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Json(payload): Json<CreateNominationRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;

    let position = payload.position.trim();
    let title = payload.title.trim();
    if position.is_empty() || title.is_empty() {
        return Err(AppError::InvalidRequest(
            "Position and title are required".into(),
        ));
    }

    let club = db::get_club(&app_state.db, payload.club_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Club not found".into()))?;

    if !club.positions.iter().any(|p| p == position) {
        return Err(AppError::InvalidRequest(format!(
            "{} has no position named {position}",
            club.name
        )));
    }

    if db::has_active_nomination(&app_state.db, club.id, position).await? {
        return Err(active_exists(position));
    }

    let nomination = db::create_nomination(
        &app_state.db,
        club.id,
        position,
        title,
        payload.description.as_deref(),
        payload.deadline,
    )
    .await
    .map_err(|e| map_active_conflict(e, position))?;

    info!(nomination_id = %nomination.id, club_id = %club.id, %position, "nomination opened");
    Ok((StatusCode::CREATED, Json(nomination)))
}

pub async fn list_nominations(
    Extension(app_state): Extension<AppState>,
    _auth: AuthContext,
    Query(filter): Query<NominationFilter>,
) -> Result<impl IntoResponse, AppError> {
    let nominations = db::list_nominations(&app_state.db, filter.club_id, filter.status).await?;
    Ok(Json(nominations))
}

pub async fn get_nomination(
    Extension(app_state): Extension<AppState>,
    _auth: AuthContext,
    Path(nomination_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(load_nomination(&app_state, nomination_id).await?))
}

pub async fn set_nomination_status(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(nomination_id): Path<Uuid>,
    Json(payload): Json<NominationStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;

    let nomination = load_nomination(&app_state, nomination_id).await?;
    if nomination.status == payload.status {
        return Err(AppError::InvalidState(format!(
            "Nomination is already {}",
            payload.status
        )));
    }

    if payload.status == NominationStatus::Active
        && db::has_active_nomination(&app_state.db, nomination.club_id, &nomination.position)
            .await?
    {
        return Err(active_exists(&nomination.position));
    }

    let nomination = db::set_nomination_status(&app_state.db, nomination_id, payload.status)
        .await
        .map_err(|e| map_active_conflict(e, &nomination.position))?
        .ok_or_else(|| AppError::NotFound("Nomination not found".into()))?;

    info!(%nomination_id, status = %nomination.status, "nomination status changed");
    Ok(Json(nomination))
}

pub async fn delete_nomination(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(nomination_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;

    if !db::delete_nomination(&app_state.db, nomination_id).await? {
        return Err(AppError::NotFound("Nomination not found".into()));
    }

    info!(%nomination_id, "nomination deleted");
    Ok(ActionResponse::ok("Nomination deleted"))
}

/// Approved applicants of a CLOSED nomination, i.e. who can be put on a ballot.
pub async fn eligible_candidates(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(nomination_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;

    let nomination = load_nomination(&app_state, nomination_id).await?;
    if nomination.status != NominationStatus::Closed {
        return Err(AppError::InvalidState(
            "Close the nomination before picking candidates".into(),
        ));
    }

    let candidates =
        db::eligible_candidates(&app_state.db, nomination.club_id, &nomination.position).await?;
    Ok(Json(candidates))
}
