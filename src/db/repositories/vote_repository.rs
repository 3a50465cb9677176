use crate::db::connection::DbPool;
use crate::db::models::{EventStatus, Vote};
use futures::future::try_join_all;
use sqlx::{Error, PgConnection};
use uuid::Uuid;

/// Inserts the ballot while the event is ONGOING, unless the voter already has
/// one for it. Returns false when nothing was stored. The unique
/// (event_id, voter_id) constraint makes this safe under concurrent
/// submissions, and the share lock on the event row keeps the ballot from
/// slipping past a resolution that holds the row.
pub async fn cast_vote(
    pool: &DbPool,
    event_id: Uuid,
    voter_id: Uuid,
    candidate_id: Uuid,
) -> Result<bool, Error> {
    let vote_id = Uuid::new_v4();
    let result = sqlx::query(
        "INSERT INTO votes (id, event_id, voter_id, candidate_id) \
         SELECT $1, e.id, $3, $4 FROM events e WHERE e.id = $2 AND e.status = $5 FOR SHARE \
         ON CONFLICT (event_id, voter_id) DO NOTHING",
    )
    .bind(vote_id)
    .bind(event_id)
    .bind(voter_id)
    .bind(candidate_id)
    .bind(EventStatus::Ongoing.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn user_has_voted(pool: &DbPool, event_id: Uuid, voter_id: Uuid) -> Result<bool, Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM votes WHERE event_id = $1 AND voter_id = $2)")
        .bind(event_id)
        .bind(voter_id)
        .fetch_one(pool)
        .await
}

pub async fn get_vote(pool: &DbPool, event_id: Uuid, voter_id: Uuid) -> Result<Option<Vote>, Error> {
    sqlx::query_as::<_, Vote>(
        "SELECT id, event_id, voter_id, candidate_id, created_at FROM votes \
         WHERE event_id = $1 AND voter_id = $2",
    )
    .bind(event_id)
    .bind(voter_id)
    .fetch_optional(pool)
    .await
}

pub async fn count_votes_for_candidate(
    pool: &DbPool,
    event_id: Uuid,
    candidate_id: Uuid,
) -> Result<i64, Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE event_id = $1 AND candidate_id = $2")
        .bind(event_id)
        .bind(candidate_id)
        .fetch_one(pool)
        .await
}

pub async fn count_votes_for_event(pool: &DbPool, event_id: Uuid) -> Result<i64, Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE event_id = $1")
        .bind(event_id)
        .fetch_one(pool)
        .await
}

/// One count per candidate, dispatched together. Results keep `candidates` order.
pub async fn count_votes_per_candidate(
    pool: &DbPool,
    event_id: Uuid,
    candidates: &[Uuid],
) -> Result<Vec<(Uuid, i64)>, Error> {
    let counts = try_join_all(
        candidates
            .iter()
            .map(|&candidate_id| count_votes_for_candidate(pool, event_id, candidate_id)),
    )
    .await?;

    Ok(candidates.iter().copied().zip(counts).collect())
}

/// Counts every candidate's ballots in one grouped query on `conn`, so the
/// tally can be read inside the transaction that acts on it. Candidates with
/// no ballots get 0. Results keep `candidates` order.
pub async fn tally_votes(
    conn: &mut PgConnection,
    event_id: Uuid,
    candidates: &[Uuid],
) -> Result<Vec<(Uuid, i64)>, Error> {
    let rows: Vec<(Uuid, i64)> = sqlx::query_as(
        "SELECT candidate_id, COUNT(*) FROM votes WHERE event_id = $1 GROUP BY candidate_id",
    )
    .bind(event_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(candidates
        .iter()
        .map(|&candidate_id| {
            let votes = rows
                .iter()
                .find(|(id, _)| *id == candidate_id)
                .map_or(0, |&(_, votes)| votes);
            (candidate_id, votes)
        })
        .collect())
}
