use crate::db::connection::DbPool;
use crate::db::models::{Event, EventStatus};
use sqlx::{Error, PgConnection, PgExecutor};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

const EVENT_COLUMNS: &str = "id, club_id, position, title, description, candidates, event_date, \
                             status, winner_id, created_at";

pub struct NewEvent<'a> {
    pub club_id: Uuid,
    pub position: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub candidates: &'a [Uuid],
    pub event_date: DateTime<Utc>,
}

pub struct EventChanges<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub event_date: Option<DateTime<Utc>>,
}

pub async fn create_event(pool: &DbPool, event: NewEvent<'_>) -> Result<Event, Error> {
    let event_id = Uuid::new_v4();

    sqlx::query_as::<_, Event>(&format!(
        "INSERT INTO events (id, club_id, position, title, description, candidates, event_date, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {EVENT_COLUMNS}"
    ))
    .bind(event_id)
    .bind(event.club_id)
    .bind(event.position)
    .bind(event.title)
    .bind(event.description)
    .bind(event.candidates)
    .bind(event.event_date)
    .bind(EventStatus::Upcoming.as_str())
    .fetch_one(pool)
    .await
}

pub async fn get_event(pool: &DbPool, event_id: Uuid) -> Result<Option<Event>, Error> {
    sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
        .bind(event_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_events(
    pool: &DbPool,
    club_id: Option<Uuid>,
    status: Option<EventStatus>,
) -> Result<Vec<Event>, Error> {
    sqlx::query_as::<_, Event>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events \
         WHERE ($1::UUID IS NULL OR club_id = $1) AND ($2::TEXT IS NULL OR status = $2) \
         ORDER BY event_date DESC"
    ))
    .bind(club_id)
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await
}

/// ONGOING events in clubs the user belongs to where they have not voted yet.
pub async fn list_open_ballots_for_user(pool: &DbPool, user_id: Uuid) -> Result<Vec<Event>, Error> {
    sqlx::query_as::<_, Event>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events e \
         WHERE e.status = $2 \
           AND EXISTS (SELECT 1 FROM club_members m WHERE m.club_id = e.club_id AND m.user_id = $1) \
           AND NOT EXISTS (SELECT 1 FROM votes v WHERE v.event_id = e.id AND v.voter_id = $1) \
         ORDER BY e.event_date"
    ))
    .bind(user_id)
    .bind(EventStatus::Ongoing.as_str())
    .fetch_all(pool)
    .await
}

/// Applies the fields that are `Some`; an empty description clears it.
pub async fn update_event(
    pool: &DbPool,
    event_id: Uuid,
    changes: EventChanges<'_>,
) -> Result<Option<Event>, Error> {
    sqlx::query_as::<_, Event>(&format!(
        "UPDATE events SET \
            title = COALESCE($2, title), \
            description = CASE WHEN $3::TEXT IS NULL THEN description ELSE NULLIF($3, '') END, \
            event_date = COALESCE($4, event_date) \
         WHERE id = $1 RETURNING {EVENT_COLUMNS}"
    ))
    .bind(event_id)
    .bind(changes.title)
    .bind(changes.description)
    .bind(changes.event_date)
    .fetch_optional(pool)
    .await
}

/// Moves the event to `next` only if it is still in `current`, so two admins
/// racing on the same event cannot both succeed.
pub async fn transition_status(
    pool: &DbPool,
    event_id: Uuid,
    current: EventStatus,
    next: EventStatus,
) -> Result<Option<Event>, Error> {
    sqlx::query_as::<_, Event>(&format!(
        "UPDATE events SET status = $3 WHERE id = $1 AND status = $2 RETURNING {EVENT_COLUMNS}"
    ))
    .bind(event_id)
    .bind(current.as_str())
    .bind(next.as_str())
    .fetch_optional(pool)
    .await
}

/// Reads the event and holds its row lock until the transaction ends. Ballots
/// take a share lock on the same row, so none can land while it is held.
pub async fn lock_event(conn: &mut PgConnection, event_id: Uuid) -> Result<Option<Event>, Error> {
    sqlx::query_as::<_, Event>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"
    ))
    .bind(event_id)
    .fetch_optional(&mut *conn)
    .await
}

/// Sets the winner and COMPLETED together. Only an ONGOING event is changed;
/// otherwise `None` is returned.
pub async fn complete_with_winner<'e, E>(
    executor: E,
    event_id: Uuid,
    winner_id: Uuid,
) -> Result<Option<Event>, Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Event>(&format!(
        "UPDATE events SET winner_id = $2, status = $3 \
         WHERE id = $1 AND status = $4 RETURNING {EVENT_COLUMNS}"
    ))
    .bind(event_id)
    .bind(winner_id)
    .bind(EventStatus::Completed.as_str())
    .bind(EventStatus::Ongoing.as_str())
    .fetch_optional(executor)
    .await
}

pub async fn delete_event(pool: &DbPool, event_id: Uuid) -> Result<bool, Error> {
    let result = sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_events_with_status(pool: &DbPool, status: EventStatus) -> Result<i64, Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE status = $1")
        .bind(status.as_str())
        .fetch_one(pool)
        .await
}
