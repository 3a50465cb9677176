use crate::db::connection::DbPool;
use crate::db::models::{Club, ClubMember};
use sqlx::Error;
use uuid::Uuid;

const CLUB_COLUMNS: &str = "id, name, description, image_url, positions, created_by, created_at";

pub struct ClubChanges<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub positions: Option<&'a [String]>,
}

pub async fn create_club(
    pool: &DbPool,
    created_by: Uuid,
    name: &str,
    description: Option<&str>,
    image_url: Option<&str>,
    positions: &[String],
) -> Result<Club, Error> {
    let club_id = Uuid::new_v4();

    sqlx::query_as::<_, Club>(&format!(
        "INSERT INTO clubs (id, name, description, image_url, positions, created_by) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {CLUB_COLUMNS}"
    ))
    .bind(club_id)
    .bind(name)
    .bind(description)
    .bind(image_url)
    .bind(positions)
    .bind(created_by)
    .fetch_one(pool)
    .await
}

pub async fn get_club(pool: &DbPool, club_id: Uuid) -> Result<Option<Club>, Error> {
    sqlx::query_as::<_, Club>(&format!("SELECT {CLUB_COLUMNS} FROM clubs WHERE id = $1"))
        .bind(club_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_clubs(pool: &DbPool) -> Result<Vec<Club>, Error> {
    sqlx::query_as::<_, Club>(&format!("SELECT {CLUB_COLUMNS} FROM clubs ORDER BY name"))
        .fetch_all(pool)
        .await
}

pub async fn list_clubs_for_user(pool: &DbPool, user_id: Uuid) -> Result<Vec<Club>, Error> {
    sqlx::query_as::<_, Club>(
        "SELECT c.id, c.name, c.description, c.image_url, c.positions, c.created_by, c.created_at \
         FROM clubs c JOIN club_members m ON m.club_id = c.id \
         WHERE m.user_id = $1 ORDER BY c.name",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Applies the fields that are `Some`; an empty description or image URL
/// clears it. Returns `None` if the club is gone.
pub async fn update_club(
    pool: &DbPool,
    club_id: Uuid,
    changes: ClubChanges<'_>,
) -> Result<Option<Club>, Error> {
    sqlx::query_as::<_, Club>(&format!(
        "UPDATE clubs SET \
            name = COALESCE($2, name), \
            description = CASE WHEN $3::TEXT IS NULL THEN description ELSE NULLIF($3, '') END, \
            image_url = CASE WHEN $4::TEXT IS NULL THEN image_url ELSE NULLIF($4, '') END, \
            positions = COALESCE($5, positions) \
         WHERE id = $1 RETURNING {CLUB_COLUMNS}"
    ))
    .bind(club_id)
    .bind(changes.name)
    .bind(changes.description)
    .bind(changes.image_url)
    .bind(changes.positions)
    .fetch_optional(pool)
    .await
}

pub async fn delete_club(pool: &DbPool, club_id: Uuid) -> Result<bool, Error> {
    let result = sqlx::query("DELETE FROM clubs WHERE id = $1")
        .bind(club_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Returns false if the user was already a member.
pub async fn add_member(pool: &DbPool, club_id: Uuid, user_id: Uuid) -> Result<bool, Error> {
    let result = sqlx::query(
        "INSERT INTO club_members (club_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(club_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn remove_member(pool: &DbPool, club_id: Uuid, user_id: Uuid) -> Result<bool, Error> {
    let result = sqlx::query("DELETE FROM club_members WHERE club_id = $1 AND user_id = $2")
        .bind(club_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn is_member(pool: &DbPool, club_id: Uuid, user_id: Uuid) -> Result<bool, Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM club_members WHERE club_id = $1 AND user_id = $2)",
    )
    .bind(club_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

pub async fn list_members(pool: &DbPool, club_id: Uuid) -> Result<Vec<ClubMember>, Error> {
    sqlx::query_as::<_, ClubMember>(
        "SELECT m.user_id, u.username, m.joined_at \
         FROM club_members m JOIN users u ON u.id = m.user_id \
         WHERE m.club_id = $1 ORDER BY m.joined_at",
    )
    .bind(club_id)
    .fetch_all(pool)
    .await
}

pub async fn count_clubs(pool: &DbPool) -> Result<i64, Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM clubs")
        .fetch_one(pool)
        .await
}
