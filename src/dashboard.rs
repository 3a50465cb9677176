use crate::auth::AuthContext;
use crate::db::{self, ApplicationStatus, EventStatus, NominationStatus, TicketStatus};
use crate::error::AppError;
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json},
    response::IntoResponse,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub users: i64,
    pub clubs: i64,
    pub active_nominations: i64,
    pub pending_applications: i64,
    pub upcoming_events: i64,
    pub ongoing_events: i64,
    pub open_tickets: i64,
}

#[derive(Debug, Serialize)]
pub struct MemberDashboard {
    pub clubs: Vec<db::Club>,
    pub open_ballots: Vec<db::Event>,
    pub applications: Vec<db::Application>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum Dashboard {
    Admin(AdminDashboard),
    Member(MemberDashboard),
}

pub async fn dashboard(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let pool = &app_state.db;

    let view = if auth.is_admin() {
        let (
            users,
            clubs,
            active_nominations,
            pending_applications,
            upcoming_events,
            ongoing_events,
            open_tickets,
        ) = tokio::try_join!(
            db::count_users(pool),
            db::count_clubs(pool),
            db::count_nominations_with_status(pool, NominationStatus::Active),
            db::count_applications_with_status(pool, ApplicationStatus::Pending),
            db::count_events_with_status(pool, EventStatus::Upcoming),
            db::count_events_with_status(pool, EventStatus::Ongoing),
            db::count_tickets_with_status(pool, TicketStatus::Open),
        )?;

        Dashboard::Admin(AdminDashboard {
            users,
            clubs,
            active_nominations,
            pending_applications,
            upcoming_events,
            ongoing_events,
            open_tickets,
        })
    } else {
        let (clubs, open_ballots, applications) = tokio::try_join!(
            db::list_clubs_for_user(pool, auth.user_id),
            db::list_open_ballots_for_user(pool, auth.user_id),
            db::list_applications_for_applicant(pool, auth.user_id),
        )?;

        Dashboard::Member(MemberDashboard {
            clubs,
            open_ballots,
            applications,
        })
    };

    Ok(Json(view))
}
