use crate::auth::AuthContext;
use crate::db::{self, Ticket, TicketMessage, TicketStatus};
use crate::error::AppError;
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
pub struct CreateTicketRequest {
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct TicketStatusRequest {
    pub status: TicketStatus,
}

#[derive(Debug, Serialize)]
pub struct TicketThread {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub messages: Vec<TicketMessage>,
}

/// Loads a ticket the caller is allowed to see: their own, or any for admins.
async fn load_visible_ticket(
    app_state: &AppState,
    auth: &AuthContext,
    ticket_id: Uuid,
) -> Result<Ticket, AppError> {
    let ticket = db::get_ticket(&app_state.db, ticket_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".into()))?;

    if ticket.author_id != auth.user_id && !auth.is_admin() {
        // other users' tickets look missing
        return Err(AppError::NotFound("Ticket not found".into()));
    }
    Ok(ticket)
}

pub async fn create_ticket(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Json(payload): Json<CreateTicketRequest>,
) -> Result<impl IntoResponse, AppError> {
    let subject = payload.subject.trim();
    let body = payload.message.trim();
    if subject.is_empty() || body.is_empty() {
        return Err(AppError::InvalidRequest(
            "Subject and message are required".into(),
        ));
    }

    let ticket = db::create_ticket(&app_state.db, auth.user_id, subject, body).await?;

    info!(ticket_id = %ticket.id, author_id = %auth.user_id, "ticket opened");
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn list_tickets(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let author = if auth.is_admin() {
        None
    } else {
        Some(auth.user_id)
    };
    Ok(Json(db::list_tickets(&app_state.db, author).await?))
}

pub async fn get_ticket(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = load_visible_ticket(&app_state, &auth, ticket_id).await?;
    let messages = db::list_messages(&app_state.db, ticket_id).await?;

    Ok(Json(TicketThread { ticket, messages }))
}

pub async fn reply(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(ticket_id): Path<Uuid>,
    Json(payload): Json<ReplyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let body = payload.message.trim();
    if body.is_empty() {
        return Err(AppError::InvalidRequest("Message cannot be empty".into()));
    }

    let ticket = load_visible_ticket(&app_state, &auth, ticket_id).await?;
    if ticket.status == TicketStatus::Closed {
        return Err(AppError::InvalidState("This ticket is closed".into()));
    }

    let message = db::add_message(&app_state.db, ticket_id, auth.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn set_ticket_status(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(ticket_id): Path<Uuid>,
    Json(payload): Json<TicketStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;

    let ticket = db::set_ticket_status(&app_state.db, ticket_id, payload.status)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".into()))?;

    info!(%ticket_id, status = %ticket.status, "ticket status changed");
    Ok(Json(ticket))
}
