mod common;

use club_backend::db::{self, ClubChanges, EventChanges, Role};
use common::{Election, account, test_pool};
use uuid::Uuid;

#[tokio::test]
async fn empty_club_fields_clear_and_missing_ones_stay() {
    let Some(pool) = test_pool().await else { return };
    let admin = account(&pool, "admin", Role::Admin).await.id;
    let club = db::create_club(
        &pool,
        admin,
        &format!("club-{}", Uuid::new_v4().simple()),
        Some("Weekly games"),
        Some("https://example.org/chess.png"),
        &["President".to_string()],
    )
    .await
    .unwrap();

    let club = db::update_club(
        &pool,
        club.id,
        ClubChanges {
            name: None,
            description: Some(""),
            image_url: None,
            positions: None,
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(club.description, None);
    assert_eq!(club.image_url.as_deref(), Some("https://example.org/chess.png"));

    let club = db::update_club(
        &pool,
        club.id,
        ClubChanges {
            name: None,
            description: Some("Monthly games"),
            image_url: Some(""),
            positions: None,
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(club.description.as_deref(), Some("Monthly games"));
    assert_eq!(club.image_url, None);
}

#[tokio::test]
async fn event_description_can_be_cleared() {
    let Some(pool) = test_pool().await else { return };
    let election = Election::setup(&pool, 1, 0).await;
    let event_id = election.event.id;

    let changes = |description: Option<&'static str>| EventChanges {
        title: None,
        description,
        event_date: None,
    };

    let event = db::update_event(&pool, event_id, changes(Some("Bring your id")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.description.as_deref(), Some("Bring your id"));

    let event = db::update_event(&pool, event_id, changes(None))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.description.as_deref(), Some("Bring your id"));
    assert_eq!(event.title, election.event.title);

    let event = db::update_event(&pool, event_id, changes(Some("")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.description, None);
}
