use crate::auth::AuthContext;
use crate::db::{self, ApplicationStatus, Nomination, NominationStatus};
use crate::error::{AppError, is_unique_violation};
use crate::nominations::load_nomination;
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::types::chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub statement: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub status: ApplicationStatus,
}

/// Whether `nomination` is taking applications at `now`.
pub fn check_accepting(nomination: &Nomination, now: DateTime<Utc>) -> Result<(), AppError> {
    if nomination.status != NominationStatus::Active {
        return Err(AppError::InvalidState(
            "This nomination is not accepting applications".into(),
        ));
    }
    if nomination.deadline.is_some_and(|deadline| now > deadline) {
        return Err(AppError::InvalidState(
            "The application deadline has passed".into(),
        ));
    }
    Ok(())
}

pub async fn apply(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(nomination_id): Path<Uuid>,
    Json(payload): Json<ApplyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let statement = payload.statement.trim();
    if statement.is_empty() {
        return Err(AppError::InvalidRequest("A statement is required".into()));
    }

    let nomination = load_nomination(&app_state, nomination_id).await?;
    check_accepting(&nomination, Utc::now())?;

    if !db::is_member(&app_state.db, nomination.club_id, auth.user_id).await? {
        return Err(AppError::Unauthorized(
            "You must be a member of this club to apply".into(),
        ));
    }

    let application = db::create_application(&app_state.db, nomination_id, auth.user_id, statement)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("You have already applied for this nomination".into())
            } else {
                e.into()
            }
        })?;

    info!(application_id = %application.id, %nomination_id, "application submitted");
    Ok((StatusCode::CREATED, Json(application)))
}

pub async fn list_for_nomination(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(nomination_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;

    load_nomination(&app_state, nomination_id).await?;
    let applications = db::list_applications_for_nomination(&app_state.db, nomination_id).await?;
    Ok(Json(applications))
}

pub async fn list_mine(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let applications = db::list_applications_for_applicant(&app_state.db, auth.user_id).await?;
    Ok(Json(applications))
}

pub async fn review(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(application_id): Path<Uuid>,
    Json(payload): Json<ReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;

    if payload.status == ApplicationStatus::Pending {
        return Err(AppError::InvalidRequest(
            "An application can only be approved or rejected".into(),
        ));
    }

    let application = db::get_application(&app_state.db, application_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Application not found".into()))?;

    let nomination = load_nomination(&app_state, application.nomination_id).await?;
    if nomination.status == NominationStatus::Inactive {
        return Err(AppError::InvalidState(
            "Applications of an inactive nomination cannot be reviewed".into(),
        ));
    }

    let application = db::review_application(&app_state.db, application_id, payload.status)
        .await?
        .ok_or_else(|| AppError::NotFound("Application not found".into()))?;

    info!(%application_id, status = %application.status, "application reviewed");
    Ok(Json(application))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn nomination(status: NominationStatus, deadline: Option<DateTime<Utc>>) -> Nomination {
        Nomination {
            id: Uuid::new_v4(),
            club_id: Uuid::new_v4(),
            position: "Treasurer".into(),
            title: "Treasurer 2026".into(),
            description: None,
            status,
            deadline,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn only_active_nominations_accept_applications() {
        let now = Utc::now();
        assert!(check_accepting(&nomination(NominationStatus::Active, None), now).is_ok());
        assert!(check_accepting(&nomination(NominationStatus::Inactive, None), now).is_err());
        assert!(check_accepting(&nomination(NominationStatus::Closed, None), now).is_err());
    }

    #[test]
    fn deadline_is_enforced() {
        let now = Utc::now();
        let open = nomination(NominationStatus::Active, Some(now + Duration::hours(1)));
        let past = nomination(NominationStatus::Active, Some(now - Duration::hours(1)));
        assert!(check_accepting(&open, now).is_ok());
        let err = check_accepting(&past, now).unwrap_err();
        assert_eq!(err.to_string(), "The application deadline has passed");
    }
}
