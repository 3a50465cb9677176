use crate::auth::AuthContext;
use crate::db::{self, DbPool, Event, EventChanges, EventStatus, NewEvent};
use crate::election::{self, Resolution, Tally, TallyEntry};
use crate::error::{ActionResponse, AppError};
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub club_id: Uuid,
    pub position: String,
    pub title: String,
    pub description: Option<String>,
    pub candidates: Vec<Uuid>,
    pub event_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct EventFilter {
    pub club_id: Option<Uuid>,
    pub status: Option<EventStatus>,
}

#[derive(Debug, Deserialize)]
pub struct EventStatusRequest {
    pub status: EventStatus,
}

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub candidate_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AssignWinnerRequest {
    pub candidate_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    #[serde(flatten)]
    pub event: Event,
    pub has_voted: bool,
    pub my_vote: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub event_id: Uuid,
    pub status: EventStatus,
    pub winner_id: Option<Uuid>,
    pub total: i64,
    pub entries: Vec<TallyEntry>,
    pub tied_candidates: Vec<Uuid>,
}

/// Outcome of running winner resolution on an event.
#[derive(Debug, Serialize)]
pub struct ResolutionResponse {
    pub success: bool,
    pub message: String,
    pub event: Event,
    pub total: i64,
    pub resolution: Resolution,
}

async fn load_event(pool: &DbPool, event_id: Uuid) -> Result<Event, AppError> {
    db::get_event(pool, event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))
}

/// Counts the ballots of every candidate standing in `event`.
pub async fn tally_event(pool: &DbPool, event: &Event) -> Result<Tally, AppError> {
    let counts = db::count_votes_per_candidate(pool, event.id, &event.candidates).await?;
    Ok(Tally::new(
        counts
            .into_iter()
            .map(|(candidate_id, votes)| TallyEntry {
                candidate_id,
                votes,
            })
            .collect(),
    ))
}

/// Records one ballot. Every rejection carries its own message.
pub async fn submit_vote(
    pool: &DbPool,
    voter_id: Uuid,
    event_id: Uuid,
    candidate_id: Uuid,
) -> Result<(), AppError> {
    let event = load_event(pool, event_id).await?;
    let is_member = db::is_member(pool, event.club_id, voter_id).await?;
    election::check_ballot(&event, is_member, candidate_id)?;

    if !db::cast_vote(pool, event_id, voter_id, candidate_id).await? {
        if db::user_has_voted(pool, event_id, voter_id).await? {
            warn!(%event_id, %voter_id, "duplicate vote rejected");
            return Err(AppError::Conflict(
                "You have already voted in this event".into(),
            ));
        }
        // the event left ONGOING after the checks above
        return Err(AppError::InvalidState(
            "Voting is not open for this event".into(),
        ));
    }

    info!(%event_id, %voter_id, "vote recorded");
    Ok(())
}

/// Tallies an ONGOING event and completes it when there is a single leader.
/// A tie leaves the event untouched for an admin to settle. The event row stays
/// locked from the count to the write, so no ballot lands in between.
pub async fn resolve_event(pool: &DbPool, event_id: Uuid) -> Result<ResolutionResponse, AppError> {
    let mut tx = pool.begin().await?;
    let event = db::lock_event(&mut tx, event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))?;
    if event.status != EventStatus::Ongoing {
        return Err(AppError::InvalidState(format!(
            "Only an ongoing event can be completed; this one is {}",
            event.status
        )));
    }

    let counts = db::tally_votes(&mut tx, event.id, &event.candidates).await?;
    let tally = Tally::new(
        counts
            .into_iter()
            .map(|(candidate_id, votes)| TallyEntry {
                candidate_id,
                votes,
            })
            .collect(),
    );
    let resolution = election::resolve(&tally)?;

    match resolution {
        Resolution::Winner { candidate_id, .. } => {
            let event = db::complete_with_winner(&mut *tx, event_id, candidate_id)
                .await?
                .ok_or_else(|| AppError::Conflict("Event was closed by someone else".into()))?;
            tx.commit().await?;

            info!(%event_id, winner_id = %candidate_id, total = tally.total, "winner assigned");
            Ok(ResolutionResponse {
                success: true,
                message: "Winner assigned and event completed".into(),
                event,
                total: tally.total,
                resolution,
            })
        }
        Resolution::Tie { ref candidates, .. } => {
            tx.rollback().await?;

            info!(%event_id, tied = candidates.len(), "tie at the top, winner must be assigned manually");
            Ok(ResolutionResponse {
                success: false,
                message: format!(
                    "{} candidates are tied; assign the winner manually",
                    candidates.len()
                ),
                event,
                total: tally.total,
                resolution,
            })
        }
    }
}

/// Admin override: completes the event with `candidate_id` as winner whatever the tally says.
pub async fn force_winner(
    pool: &DbPool,
    event_id: Uuid,
    candidate_id: Uuid,
) -> Result<Event, AppError> {
    let event = load_event(pool, event_id).await?;
    election::check_winner_override(&event, candidate_id)?;

    let event = db::complete_with_winner(pool, event_id, candidate_id)
        .await?
        .ok_or_else(|| AppError::Conflict("Event was closed by someone else".into()))?;

    info!(%event_id, winner_id = %candidate_id, "winner assigned manually");
    Ok(event)
}

/// Rejects an empty or repeated candidate list, or anyone not approved under
/// a CLOSED nomination for the position.
pub fn check_candidates(candidates: &[Uuid], eligible: &[Uuid]) -> Result<(), AppError> {
    if candidates.is_empty() {
        return Err(AppError::InvalidRequest(
            "An event needs at least one candidate".into(),
        ));
    }

    let mut seen = HashSet::with_capacity(candidates.len());
    if !candidates.iter().all(|c| seen.insert(*c)) {
        return Err(AppError::InvalidRequest(
            "A candidate is listed more than once".into(),
        ));
    }

    let ineligible: Vec<String> = candidates
        .iter()
        .filter(|c| !eligible.contains(*c))
        .map(Uuid::to_string)
        .collect();
    if !ineligible.is_empty() {
        return Err(AppError::InvalidRequest(format!(
            "Not approved under a closed nomination for this position: {}",
            ineligible.join(", ")
        )));
    }
    Ok(())
}

pub async fn create_event(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Json(payload): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;

    let title = payload.title.trim();
    let position = payload.position.trim();
    if title.is_empty() || position.is_empty() {
        return Err(AppError::InvalidRequest(
            "Title and position are required".into(),
        ));
    }

    db::get_club(&app_state.db, payload.club_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Club not found".into()))?;

    let eligible = db::eligible_candidates(&app_state.db, payload.club_id, position).await?;
    check_candidates(&payload.candidates, &eligible)?;

    let event = db::create_event(
        &app_state.db,
        NewEvent {
            club_id: payload.club_id,
            position,
            title,
            description: payload.description.as_deref(),
            candidates: &payload.candidates,
            event_date: payload.event_date,
        },
    )
    .await?;

    info!(event_id = %event.id, club_id = %event.club_id, candidates = event.candidates.len(), "event created");
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn list_events(
    Extension(app_state): Extension<AppState>,
    _auth: AuthContext,
    Query(filter): Query<EventFilter>,
) -> Result<impl IntoResponse, AppError> {
    let events = db::list_events(&app_state.db, filter.club_id, filter.status).await?;
    Ok(Json(events))
}

pub async fn get_event(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&app_state.db, event_id).await?;
    let my_vote = db::get_vote(&app_state.db, event_id, auth.user_id)
        .await?
        .map(|vote| vote.candidate_id);

    Ok(Json(EventResponse {
        event,
        has_voted: my_vote.is_some(),
        my_vote,
    }))
}

pub async fn update_event(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;

    let event = load_event(&app_state.db, event_id).await?;
    if event.status.is_terminal() {
        return Err(AppError::InvalidState(format!(
            "A {} event cannot be edited",
            event.status
        )));
    }

    let title = payload.title.as_deref().map(str::trim);
    if title == Some("") {
        return Err(AppError::InvalidRequest("Title cannot be empty".into()));
    }

    let event = db::update_event(
        &app_state.db,
        event_id,
        EventChanges {
            title,
            description: payload.description.as_deref().map(str::trim),
            event_date: payload.event_date,
        },
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Event not found".into()))?;

    Ok(Json(event))
}

pub async fn delete_event(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;

    let votes = db::count_votes_for_event(&app_state.db, event_id).await?;
    if !db::delete_event(&app_state.db, event_id).await? {
        return Err(AppError::NotFound("Event not found".into()));
    }

    info!(%event_id, votes_removed = votes, "event deleted");
    Ok(ActionResponse::ok("Event deleted"))
}

/// Status changes. Asking for COMPLETED runs winner resolution instead of a
/// plain status write.
pub async fn set_event_status(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<EventStatusRequest>,
) -> Result<axum::response::Response, AppError> {
    auth.require_admin()?;

    if payload.status == EventStatus::Completed {
        let outcome = resolve_event(&app_state.db, event_id).await?;
        return Ok(Json(outcome).into_response());
    }

    let event = load_event(&app_state.db, event_id).await?;
    if !event.status.can_transition_to(payload.status) {
        return Err(AppError::InvalidState(format!(
            "Cannot move an event from {} to {}",
            event.status, payload.status
        )));
    }

    let event = db::transition_status(&app_state.db, event_id, event.status, payload.status)
        .await?
        .ok_or_else(|| AppError::Conflict("Event status changed concurrently, reload and retry".into()))?;

    info!(%event_id, status = %event.status, "event status changed");
    Ok(Json(event).into_response())
}

pub async fn resolve(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;
    Ok(Json(resolve_event(&app_state.db, event_id).await?))
}

pub async fn assign_winner(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<AssignWinnerRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;
    Ok(Json(
        force_winner(&app_state.db, event_id, payload.candidate_id).await?,
    ))
}

pub async fn cast_vote(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<CastVoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    submit_vote(&app_state.db, auth.user_id, event_id, payload.candidate_id).await?;
    Ok((
        StatusCode::CREATED,
        ActionResponse::ok("Vote recorded successfully"),
    ))
}

pub async fn results(
    Extension(app_state): Extension<AppState>,
    auth: AuthContext,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&app_state.db, event_id).await?;
    let has_voted = db::user_has_voted(&app_state.db, event_id, auth.user_id).await?;

    if !election::results_visible(event.status, has_voted, auth.is_admin()) {
        return Err(AppError::Unauthorized("Vote first to see the results".into()));
    }

    let tally = tally_event(&app_state.db, &event).await?;
    let tied_candidates = match (event.winner_id, election::resolve(&tally)) {
        (None, Ok(Resolution::Tie { candidates, .. })) => candidates,
        _ => Vec::new(),
    };

    Ok(Json(ResultsResponse {
        event_id,
        status: event.status,
        winner_id: event.winner_id,
        total: tally.total,
        entries: tally.ranked(),
        tied_candidates,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_must_be_eligible_and_distinct() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let eligible = [a, b];

        assert!(check_candidates(&[a, b], &eligible).is_ok());
        assert!(check_candidates(&[b], &eligible).is_ok());
        assert!(check_candidates(&[], &eligible).is_err());
        assert!(check_candidates(&[a, a], &eligible).is_err());

        let err = check_candidates(&[a, c], &eligible).unwrap_err();
        assert!(err.to_string().contains(&c.to_string()));
        assert!(!err.to_string().contains(&a.to_string()));
    }
}
