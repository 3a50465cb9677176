use crate::db::connection::DbPool;
use crate::db::models::{Role, User};
use sqlx::Error;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, password_hash, role, created_at";

pub async fn create_user(
    pool: &DbPool,
    username: &str,
    password_hash: &str,
    role: Role,
) -> Result<User, Error> {
    let user_id = Uuid::new_v4();

    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (id, username, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
    ))
    .bind(user_id)
    .bind(username)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(pool)
    .await
}

pub async fn get_user(pool: &DbPool, user_id: Uuid) -> Result<Option<User>, Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_user_by_username(pool: &DbPool, username: &str) -> Result<Option<User>, Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub async fn list_users(pool: &DbPool) -> Result<Vec<User>, Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY username"
    ))
    .fetch_all(pool)
    .await
}

/// Returns false when no user has that id.
pub async fn set_role(pool: &DbPool, user_id: Uuid, role: Role) -> Result<bool, Error> {
    let result = sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
        .bind(role.as_str())
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_users(pool: &DbPool) -> Result<i64, Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
}
