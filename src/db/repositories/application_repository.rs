use crate::db::connection::DbPool;
use crate::db::models::{Application, ApplicationStatus, NominationStatus};
use sqlx::Error;
use uuid::Uuid;

const APPLICATION_COLUMNS: &str =
    "id, nomination_id, applicant_id, statement, status, created_at, reviewed_at";

pub async fn create_application(
    pool: &DbPool,
    nomination_id: Uuid,
    applicant_id: Uuid,
    statement: &str,
) -> Result<Application, Error> {
    let application_id = Uuid::new_v4();

    sqlx::query_as::<_, Application>(&format!(
        "INSERT INTO applications (id, nomination_id, applicant_id, statement, status) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {APPLICATION_COLUMNS}"
    ))
    .bind(application_id)
    .bind(nomination_id)
    .bind(applicant_id)
    .bind(statement)
    .bind(ApplicationStatus::Pending.as_str())
    .fetch_one(pool)
    .await
}

pub async fn get_application(
    pool: &DbPool,
    application_id: Uuid,
) -> Result<Option<Application>, Error> {
    sqlx::query_as::<_, Application>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1"
    ))
    .bind(application_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_applications_for_nomination(
    pool: &DbPool,
    nomination_id: Uuid,
) -> Result<Vec<Application>, Error> {
    sqlx::query_as::<_, Application>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM applications WHERE nomination_id = $1 ORDER BY created_at"
    ))
    .bind(nomination_id)
    .fetch_all(pool)
    .await
}

pub async fn list_applications_for_applicant(
    pool: &DbPool,
    applicant_id: Uuid,
) -> Result<Vec<Application>, Error> {
    sqlx::query_as::<_, Application>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM applications WHERE applicant_id = $1 ORDER BY created_at DESC"
    ))
    .bind(applicant_id)
    .fetch_all(pool)
    .await
}

pub async fn review_application(
    pool: &DbPool,
    application_id: Uuid,
    status: ApplicationStatus,
) -> Result<Option<Application>, Error> {
    sqlx::query_as::<_, Application>(&format!(
        "UPDATE applications SET status = $2, reviewed_at = CURRENT_TIMESTAMP \
         WHERE id = $1 RETURNING {APPLICATION_COLUMNS}"
    ))
    .bind(application_id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await
}

/// Users approved under a CLOSED nomination for this club and position.
/// These are the only users who may stand as event candidates.
pub async fn eligible_candidates(
    pool: &DbPool,
    club_id: Uuid,
    position: &str,
) -> Result<Vec<Uuid>, Error> {
    sqlx::query_scalar(
        "SELECT DISTINCT a.applicant_id FROM applications a \
         JOIN nominations n ON n.id = a.nomination_id \
         WHERE n.club_id = $1 AND n.position = $2 AND n.status = $3 AND a.status = $4",
    )
    .bind(club_id)
    .bind(position)
    .bind(NominationStatus::Closed.as_str())
    .bind(ApplicationStatus::Approved.as_str())
    .fetch_all(pool)
    .await
}

pub async fn count_applications_with_status(
    pool: &DbPool,
    status: ApplicationStatus,
) -> Result<i64, Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM applications WHERE status = $1")
        .bind(status.as_str())
        .fetch_one(pool)
        .await
}
