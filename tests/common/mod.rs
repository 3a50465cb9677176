#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
    },
};
use club_backend::db::{self, DbPool, Event, EventStatus, NewEvent, NominationStatus, Role};
use club_backend::{auth, config::Config, router, startup::AppState};
use serde_json::{Value, json};
use sqlx::types::chrono::Utc;
use tokio::sync::OnceCell;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, SessionManagerLayer};
use uuid::Uuid;

static SCHEMA: OnceCell<()> = OnceCell::const_new();

/// Pool against `DATABASE_URL`, or `None` when no database is configured.
pub async fn test_pool() -> Option<DbPool> {
    dotenvy::dotenv().ok();
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };

    let pool = db::connect(&database_url, 5)
        .await
        .expect("could not connect to DATABASE_URL");
    SCHEMA
        .get_or_init(|| async {
            db::init_db(&pool).await.expect("schema init failed");
        })
        .await;
    Some(pool)
}

/// Password of every account made by [`account`] and [`user`].
pub const PASSWORD: &str = "correct horse battery";

static PASSWORD_HASH: OnceCell<String> = OnceCell::const_new();

pub async fn account(pool: &DbPool, prefix: &str, role: Role) -> db::User {
    let hash = PASSWORD_HASH
        .get_or_init(|| async { auth::hash_password(PASSWORD.to_string()).await.unwrap() })
        .await;
    let username = format!("{prefix}-{}", Uuid::new_v4().simple());
    db::create_user(pool, &username, hash, role).await.unwrap()
}

pub async fn user(pool: &DbPool, prefix: &str) -> Uuid {
    account(pool, prefix, Role::User).await.id
}

/// A club with one position, an admin, `candidates` approved under a closed
/// nomination and `voters` members ready to vote.
pub struct Election {
    pub admin: Uuid,
    pub club_id: Uuid,
    pub candidates: Vec<Uuid>,
    pub voters: Vec<Uuid>,
    pub event: Event,
}

pub const POSITION: &str = "President";

impl Election {
    pub async fn setup(pool: &DbPool, candidates: usize, voters: usize) -> Self {
        let admin = account(pool, "admin", Role::Admin).await.id;
        let club = db::create_club(
            pool,
            admin,
            &format!("club-{}", Uuid::new_v4().simple()),
            None,
            None,
            &[POSITION.to_string()],
        )
        .await
        .unwrap();

        let nomination = db::create_nomination(pool, club.id, POSITION, "Elect a president", None, None)
            .await
            .unwrap();

        let mut candidate_ids = Vec::with_capacity(candidates);
        for _ in 0..candidates {
            let candidate = user(pool, "candidate").await;
            db::add_member(pool, club.id, candidate).await.unwrap();
            let application = db::create_application(pool, nomination.id, candidate, "Vote for me")
                .await
                .unwrap();
            db::review_application(pool, application.id, db::ApplicationStatus::Approved)
                .await
                .unwrap();
            candidate_ids.push(candidate);
        }
        db::set_nomination_status(pool, nomination.id, NominationStatus::Closed)
            .await
            .unwrap();

        let mut voter_ids = Vec::with_capacity(voters);
        for _ in 0..voters {
            let voter = user(pool, "voter").await;
            db::add_member(pool, club.id, voter).await.unwrap();
            voter_ids.push(voter);
        }

        let event = db::create_event(
            pool,
            NewEvent {
                club_id: club.id,
                position: POSITION,
                title: "Presidential election",
                description: None,
                candidates: &candidate_ids,
                event_date: Utc::now(),
            },
        )
        .await
        .unwrap();

        Election {
            admin,
            club_id: club.id,
            candidates: candidate_ids,
            voters: voter_ids,
            event,
        }
    }

    pub async fn open(&mut self, pool: &DbPool) {
        self.event = db::transition_status(pool, self.event.id, EventStatus::Upcoming, EventStatus::Ongoing)
            .await
            .unwrap()
            .expect("event should still be UPCOMING");
    }
}

/// The full router over a real database, with sessions kept in memory for the
/// lifetime of the test.
pub struct TestApp {
    router: Router,
    pool: DbPool,
}

impl TestApp {
    pub fn new(pool: DbPool) -> Self {
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://localhost/unused".to_string()),
            _ => None,
        })
        .unwrap();
        let router = router(AppState::new(pool.clone(), config))
            .layer(SessionManagerLayer::new(MemoryStore::default()));
        TestApp { router, pool }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value, Option<String>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap(), cookie)
    }

    /// Signs `user_id` in and returns the session cookie.
    pub async fn sign_in(&self, user_id: Uuid) -> String {
        let user = db::get_user(&self.pool, user_id).await.unwrap().unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "username": user.username, "password": PASSWORD }).to_string(),
            ))
            .unwrap();
        let (status, _, cookie) = self.send(request).await;
        assert_eq!(status, StatusCode::OK);
        cookie.expect("login should set a session cookie")
    }

    pub async fn get(&self, cookie: &str, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .header(COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let (status, body, _) = self.send(request).await;
        (status, body)
    }

    pub async fn json(&self, cookie: &str, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(COOKIE, cookie)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, body, _) = self.send(request).await;
        (status, body)
    }
}
