use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use club_backend::{config::Config, router, startup::AppState};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, SessionManagerLayer};
use uuid::Uuid;

/// Router with an in-memory session store and a pool that never connects.
/// Only requests rejected before touching the database can be exercised.
fn app() -> Router {
    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/unused".to_string()),
        _ => None,
    })
    .unwrap();
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .unwrap();

    router(AppState::new(pool, config)).layer(SessionManagerLayer::new(MemoryStore::default()))
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let request = Request::builder()
        .uri("/does-not-exist")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn voting_requires_a_session() {
    let uri = format!("/events/{}/votes", Uuid::new_v4());
    let (status, body) = send(json_request(
        "POST",
        &uri,
        serde_json::json!({ "candidate_id": Uuid::new_v4() }),
    ))
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Sign in to continue");
}

#[tokio::test]
async fn results_and_dashboard_require_a_session() {
    for uri in [
        format!("/events/{}/results", Uuid::new_v4()),
        "/dashboard".to_string(),
        "/auth/me".to_string(),
    ] {
        let request = Request::builder().uri(&uri).body(Body::empty()).unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn admin_routes_reject_anonymous_callers() {
    let (status, _) = send(json_request(
        "POST",
        "/clubs",
        serde_json::json!({ "name": "Chess", "positions": ["President"] }),
    ))
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let uri = format!("/events/{}/status", Uuid::new_v4());
    let (status, _) = send(json_request(
        "PATCH",
        &uri,
        serde_json::json!({ "status": "COMPLETED" }),
    ))
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_validates_before_storing() {
    let (status, body) = send(json_request(
        "POST",
        "/auth/register",
        serde_json::json!({ "username": "alice", "password": "short" }),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Password must be at least 8 characters");
}

#[tokio::test]
async fn logout_without_session_succeeds() {
    let request = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}
