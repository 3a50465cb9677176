use crate::db::connection::DbPool;
use crate::db::models::{Nomination, NominationStatus};
use sqlx::Error;
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

const NOMINATION_COLUMNS: &str =
    "id, club_id, position, title, description, status, deadline, created_at";

pub async fn create_nomination(
    pool: &DbPool,
    club_id: Uuid,
    position: &str,
    title: &str,
    description: Option<&str>,
    deadline: Option<DateTime<Utc>>,
) -> Result<Nomination, Error> {
    let nomination_id = Uuid::new_v4();

    sqlx::query_as::<_, Nomination>(&format!(
        "INSERT INTO nominations (id, club_id, position, title, description, status, deadline) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {NOMINATION_COLUMNS}"
    ))
    .bind(nomination_id)
    .bind(club_id)
    .bind(position)
    .bind(title)
    .bind(description)
    .bind(NominationStatus::Active.as_str())
    .bind(deadline)
    .fetch_one(pool)
    .await
}

pub async fn get_nomination(pool: &DbPool, nomination_id: Uuid) -> Result<Option<Nomination>, Error> {
    sqlx::query_as::<_, Nomination>(&format!(
        "SELECT {NOMINATION_COLUMNS} FROM nominations WHERE id = $1"
    ))
    .bind(nomination_id)
    .fetch_optional(pool)
    .await
}

/// Lists nominations, optionally narrowed to one club and/or one status.
pub async fn list_nominations(
    pool: &DbPool,
    club_id: Option<Uuid>,
    status: Option<NominationStatus>,
) -> Result<Vec<Nomination>, Error> {
    sqlx::query_as::<_, Nomination>(&format!(
        "SELECT {NOMINATION_COLUMNS} FROM nominations \
         WHERE ($1::UUID IS NULL OR club_id = $1) AND ($2::TEXT IS NULL OR status = $2) \
         ORDER BY created_at DESC"
    ))
    .bind(club_id)
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await
}

/// Whether the club already has an ACTIVE nomination for `position`.
pub async fn has_active_nomination(
    pool: &DbPool,
    club_id: Uuid,
    position: &str,
) -> Result<bool, Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM nominations WHERE club_id = $1 AND position = $2 AND status = $3)",
    )
    .bind(club_id)
    .bind(position)
    .bind(NominationStatus::Active.as_str())
    .fetch_one(pool)
    .await
}

pub async fn set_nomination_status(
    pool: &DbPool,
    nomination_id: Uuid,
    status: NominationStatus,
) -> Result<Option<Nomination>, Error> {
    sqlx::query_as::<_, Nomination>(&format!(
        "UPDATE nominations SET status = $2 WHERE id = $1 RETURNING {NOMINATION_COLUMNS}"
    ))
    .bind(nomination_id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await
}

pub async fn delete_nomination(pool: &DbPool, nomination_id: Uuid) -> Result<bool, Error> {
    let result = sqlx::query("DELETE FROM nominations WHERE id = $1")
        .bind(nomination_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_nominations_with_status(
    pool: &DbPool,
    status: NominationStatus,
) -> Result<i64, Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM nominations WHERE status = $1")
        .bind(status.as_str())
        .fetch_one(pool)
        .await
}
