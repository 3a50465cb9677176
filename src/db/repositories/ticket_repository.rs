use crate::db::connection::DbPool;
use crate::db::models::{Ticket, TicketMessage, TicketStatus};
use sqlx::Error;
use uuid::Uuid;

const TICKET_COLUMNS: &str = "id, author_id, subject, status, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, ticket_id, author_id, body, created_at";

/// Opens a ticket together with its first message.
pub async fn create_ticket(
    pool: &DbPool,
    author_id: Uuid,
    subject: &str,
    body: &str,
) -> Result<Ticket, Error> {
    let mut tx = pool.begin().await?;

    let ticket = sqlx::query_as::<_, Ticket>(&format!(
        "INSERT INTO tickets (id, author_id, subject, status) VALUES ($1, $2, $3, $4) \
         RETURNING {TICKET_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(author_id)
    .bind(subject)
    .bind(TicketStatus::Open.as_str())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO ticket_messages (id, ticket_id, author_id, body) VALUES ($1, $2, $3, $4)")
        .bind(Uuid::new_v4())
        .bind(ticket.id)
        .bind(author_id)
        .bind(body)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(ticket)
}

pub async fn get_ticket(pool: &DbPool, ticket_id: Uuid) -> Result<Option<Ticket>, Error> {
    sqlx::query_as::<_, Ticket>(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"))
        .bind(ticket_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_tickets(pool: &DbPool, author_id: Option<Uuid>) -> Result<Vec<Ticket>, Error> {
    sqlx::query_as::<_, Ticket>(&format!(
        "SELECT {TICKET_COLUMNS} FROM tickets WHERE ($1::UUID IS NULL OR author_id = $1) \
         ORDER BY updated_at DESC"
    ))
    .bind(author_id)
    .fetch_all(pool)
    .await
}

pub async fn list_messages(pool: &DbPool, ticket_id: Uuid) -> Result<Vec<TicketMessage>, Error> {
    sqlx::query_as::<_, TicketMessage>(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM ticket_messages WHERE ticket_id = $1 ORDER BY created_at"
    ))
    .bind(ticket_id)
    .fetch_all(pool)
    .await
}

pub async fn add_message(
    pool: &DbPool,
    ticket_id: Uuid,
    author_id: Uuid,
    body: &str,
) -> Result<TicketMessage, Error> {
    let mut tx = pool.begin().await?;

    let message = sqlx::query_as::<_, TicketMessage>(&format!(
        "INSERT INTO ticket_messages (id, ticket_id, author_id, body) VALUES ($1, $2, $3, $4) \
         RETURNING {MESSAGE_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(ticket_id)
    .bind(author_id)
    .bind(body)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE tickets SET updated_at = CURRENT_TIMESTAMP WHERE id = $1")
        .bind(ticket_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(message)
}

pub async fn set_ticket_status(
    pool: &DbPool,
    ticket_id: Uuid,
    status: TicketStatus,
) -> Result<Option<Ticket>, Error> {
    sqlx::query_as::<_, Ticket>(&format!(
        "UPDATE tickets SET status = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1 \
         RETURNING {TICKET_COLUMNS}"
    ))
    .bind(ticket_id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await
}

pub async fn count_tickets_with_status(pool: &DbPool, status: TicketStatus) -> Result<i64, Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE status = $1")
        .bind(status.as_str())
        .fetch_one(pool)
        .await
}
