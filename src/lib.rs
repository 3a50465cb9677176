//! Club membership and election backend.
//!
//! Admins run clubs, open nominations for club positions, review applications
//! and turn approved applicants into election events. Members join clubs,
//! apply, vote once per event and see results once they have voted or the
//! event is over. A small ticket system connects users with admins.

use axum::{
    Json, Router,
    extract::Extension,
    http::{
        Method, StatusCode,
        header::{ACCEPT, CONTENT_TYPE},
    },
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod applications;
pub mod auth;
pub mod clubs;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod election;
pub mod error;
pub mod events;
pub mod nominations;
pub mod startup;
pub mod tickets;
pub mod users;

use startup::AppState;

/// Every route of the API. Callers add the session layer on top.
pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/users", get(users::list_users))
        .route("/users/:id/role", patch(users::set_role))
        .route("/clubs", get(clubs::list_clubs).post(clubs::create_club))
        .route(
            "/clubs/:id",
            get(clubs::get_club)
                .patch(clubs::update_club)
                .delete(clubs::delete_club),
        )
        .route("/clubs/:id/members", get(clubs::list_members))
        .route(
            "/clubs/:id/membership",
            post(clubs::join_club).delete(clubs::leave_club),
        )
        .route(
            "/nominations",
            get(nominations::list_nominations).post(nominations::create_nomination),
        )
        .route(
            "/nominations/:id",
            get(nominations::get_nomination).delete(nominations::delete_nomination),
        )
        .route(
            "/nominations/:id/status",
            patch(nominations::set_nomination_status),
        )
        .route(
            "/nominations/:id/applications",
            get(applications::list_for_nomination).post(applications::apply),
        )
        .route(
            "/nominations/:id/eligible",
            get(nominations::eligible_candidates),
        )
        .route("/applications/mine", get(applications::list_mine))
        .route("/applications/:id/review", patch(applications::review))
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/:id",
            get(events::get_event)
                .patch(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/:id/status", patch(events::set_event_status))
        .route("/events/:id/resolve", post(events::resolve))
        .route("/events/:id/winner", post(events::assign_winner))
        .route("/events/:id/votes", post(events::cast_vote))
        .route("/events/:id/results", get(events::results))
        .route(
            "/tickets",
            get(tickets::list_tickets).post(tickets::create_ticket),
        )
        .route("/tickets/:id", get(tickets::get_ticket))
        .route("/tickets/:id/messages", post(tickets::reply))
        .route("/tickets/:id/status", patch(tickets::set_ticket_status))
        .route("/dashboard", get(dashboard::dashboard))
        .fallback(handler_404)
        .layer(Extension(app_state))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_credentials(true)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([CONTENT_TYPE, ACCEPT]),
        )
        .layer(TraceLayer::new_for_http())
}

async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": "nothing to see here",
        })),
    )
}
