//! Vote counting, winner resolution and ballot eligibility.
//!
//! Everything here is pure: the handlers in [`crate::events`] load rows and
//! hand them over, then persist whatever outcome comes back.

use crate::db::models::{Event, EventStatus};
use crate::error::AppError;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TallyEntry {
    pub candidate_id: Uuid,
    pub votes: i64,
}

/// Per-candidate vote counts in the event's candidate order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub entries: Vec<TallyEntry>,
    pub total: i64,
}

impl Tally {
    pub fn new(entries: Vec<TallyEntry>) -> Self {
        let total = entries.iter().map(|e| e.votes).sum();
        Tally { entries, total }
    }

    /// Entries ordered by votes, highest first. Equal counts keep candidate order.
    pub fn ranked(&self) -> Vec<TallyEntry> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.votes.cmp(&a.votes));
        ranked
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    Winner { candidate_id: Uuid, votes: i64 },
    Tie { candidates: Vec<Uuid>, votes: i64 },
}

/// Picks the unique leader of a tally, or the set of candidates tied at the top.
pub fn resolve(tally: &Tally) -> Result<Resolution, AppError> {
    let ranked = tally.ranked();
    let Some(top) = ranked.first() else {
        return Err(AppError::InvalidState(
            "Event has no candidates to resolve".into(),
        ));
    };

    let leaders: Vec<Uuid> = ranked
        .iter()
        .take_while(|e| e.votes == top.votes)
        .map(|e| e.candidate_id)
        .collect();

    if leaders.len() == 1 {
        Ok(Resolution::Winner {
            candidate_id: top.candidate_id,
            votes: top.votes,
        })
    } else {
        Ok(Resolution::Tie {
            candidates: leaders,
            votes: top.votes,
        })
    }
}

/// Checks everything about a ballot that can be decided before touching the
/// vote table. The duplicate-vote check happens at insert time.
pub fn check_ballot(event: &Event, is_member: bool, candidate_id: Uuid) -> Result<(), AppError> {
    if event.status != EventStatus::Ongoing {
        return Err(AppError::InvalidState(
            "Voting is not open for this event".into(),
        ));
    }
    if !is_member {
        return Err(AppError::Unauthorized(
            "You must be a member of this club to vote".into(),
        ));
    }
    if !event.candidates.contains(&candidate_id) {
        return Err(AppError::InvalidState(
            "Candidate is not standing in this event".into(),
        ));
    }
    Ok(())
}

/// Results stay hidden until the event is over or the viewer has voted.
pub fn results_visible(status: EventStatus, has_voted: bool, is_admin: bool) -> bool {
    status == EventStatus::Completed || has_voted || is_admin
}

/// Checks that `candidate_id` can be forced as the winner of `event`.
pub fn check_winner_override(event: &Event, candidate_id: Uuid) -> Result<(), AppError> {
    if !event.status.can_transition_to(EventStatus::Completed) {
        return Err(AppError::InvalidState(format!(
            "Only an ongoing event can be completed; this one is {}",
            event.status
        )));
    }
    if !event.candidates.contains(&candidate_id) {
        return Err(AppError::InvalidState(
            "Candidate is not standing in this event".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(status: EventStatus, candidates: Vec<Uuid>) -> Event {
        Event {
            id: Uuid::new_v4(),
            club_id: Uuid::new_v4(),
            position: "President".into(),
            title: "Presidential election".into(),
            description: None,
            candidates,
            event_date: Utc::now(),
            status,
            winner_id: None,
            created_at: Utc::now(),
        }
    }

    fn tally(counts: &[(Uuid, i64)]) -> Tally {
        Tally::new(
            counts
                .iter()
                .map(|&(candidate_id, votes)| TallyEntry {
                    candidate_id,
                    votes,
                })
                .collect(),
        )
    }

    #[test]
    fn total_is_sum_of_counts() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let t = tally(&[(a, 4), (b, 0), (c, 9)]);
        assert_eq!(t.total, 13);
        assert_eq!(t.entries.len(), 3);
    }

    #[test]
    fn unique_leader_wins() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let resolution = resolve(&tally(&[(a, 5), (b, 2)])).unwrap();
        assert_eq!(
            resolution,
            Resolution::Winner {
                candidate_id: a,
                votes: 5
            }
        );
    }

    #[test]
    fn leader_listed_last_still_wins() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let resolution = resolve(&tally(&[(a, 1), (b, 2), (c, 3)])).unwrap();
        assert!(matches!(resolution, Resolution::Winner { candidate_id, .. } if candidate_id == c));
    }

    #[test]
    fn tie_at_the_top_returns_exactly_the_tied_set() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let t = tally(&[(a, 3), (b, 3), (c, 1)]);
        assert_eq!(t.total, 7);
        assert_eq!(
            resolve(&t).unwrap(),
            Resolution::Tie {
                candidates: vec![a, b],
                votes: 3
            }
        );
    }

    #[test]
    fn two_way_tie_with_six_votes() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let t = tally(&[(a, 3), (b, 3)]);
        assert_eq!(t.total, 6);
        assert!(matches!(resolve(&t).unwrap(), Resolution::Tie { candidates, .. } if candidates == vec![a, b]));
    }

    #[test]
    fn no_votes_at_all_is_a_tie_between_everyone() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let resolution = resolve(&tally(&[(a, 0), (b, 0)])).unwrap();
        assert_eq!(
            resolution,
            Resolution::Tie {
                candidates: vec![a, b],
                votes: 0
            }
        );
    }

    #[test]
    fn empty_tally_cannot_be_resolved() {
        let err = resolve(&Tally::new(vec![])).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn ballot_rejected_unless_ongoing() {
        let a = Uuid::new_v4();
        for status in [
            EventStatus::Upcoming,
            EventStatus::Completed,
            EventStatus::Cancelled,
        ] {
            let err = check_ballot(&event(status, vec![a]), true, a).unwrap_err();
            assert!(matches!(err, AppError::InvalidState(_)));
        }
        assert!(check_ballot(&event(EventStatus::Ongoing, vec![a]), true, a).is_ok());
    }

    #[test]
    fn non_member_rejected_even_for_valid_candidate() {
        let a = Uuid::new_v4();
        let err = check_ballot(&event(EventStatus::Ongoing, vec![a]), false, a).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn unknown_candidate_rejected() {
        let a = Uuid::new_v4();
        let err = check_ballot(&event(EventStatus::Ongoing, vec![a]), true, Uuid::new_v4())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Candidate is not standing in this event"
        );
    }

    #[test]
    fn results_gate() {
        assert!(!results_visible(EventStatus::Ongoing, false, false));
        assert!(results_visible(EventStatus::Ongoing, true, false));
        assert!(results_visible(EventStatus::Ongoing, false, true));
        assert!(results_visible(EventStatus::Completed, false, false));
    }

    #[test]
    fn winner_override_requires_open_event_and_real_candidate() {
        let a = Uuid::new_v4();
        assert!(check_winner_override(&event(EventStatus::Ongoing, vec![a]), a).is_ok());
        for status in [
            EventStatus::Upcoming,
            EventStatus::Completed,
            EventStatus::Cancelled,
        ] {
            assert!(matches!(
                check_winner_override(&event(status, vec![a]), a),
                Err(AppError::InvalidState(_))
            ));
        }
        assert!(
            check_winner_override(&event(EventStatus::Ongoing, vec![a]), Uuid::new_v4()).is_err()
        );
    }
}
