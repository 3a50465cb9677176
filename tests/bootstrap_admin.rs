mod common;

use club_backend::auth::seed_admin;
use club_backend::config::AdminSeed;
use club_backend::db::{self, Role};
use common::{PASSWORD, account, test_pool};
use uuid::Uuid;

#[tokio::test]
async fn creates_the_admin_when_the_name_is_free() {
    let Some(pool) = test_pool().await else { return };
    let username = format!("root-{}", Uuid::new_v4().simple());

    seed_admin(
        &pool,
        &AdminSeed {
            username: username.clone(),
            password: "operator-secret".into(),
        },
    )
    .await
    .unwrap();

    let user = db::get_user_by_username(&pool, &username).await.unwrap().unwrap();
    assert_eq!(user.role, Role::Admin);
}

#[tokio::test]
async fn account_registered_under_the_admin_name_is_not_promoted() {
    let Some(pool) = test_pool().await else { return };
    let squatter = account(&pool, "root", Role::User).await;

    seed_admin(
        &pool,
        &AdminSeed {
            username: squatter.username.clone(),
            password: "operator-secret".into(),
        },
    )
    .await
    .unwrap();

    let user = db::get_user(&pool, squatter.id).await.unwrap().unwrap();
    assert_eq!(user.role, Role::User);
    assert_eq!(user.password_hash, squatter.password_hash);
}

#[tokio::test]
async fn unreadable_stored_hash_is_not_promoted() {
    let Some(pool) = test_pool().await else { return };
    let username = format!("root-{}", Uuid::new_v4().simple());
    let user = db::create_user(&pool, &username, "not-a-bcrypt-hash", Role::User)
        .await
        .unwrap();

    seed_admin(
        &pool,
        &AdminSeed {
            username,
            password: "operator-secret".into(),
        },
    )
    .await
    .unwrap();

    let user = db::get_user(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(user.role, Role::User);
}

#[tokio::test]
async fn existing_account_with_the_configured_password_is_promoted() {
    let Some(pool) = test_pool().await else { return };
    let existing = account(&pool, "root", Role::User).await;

    seed_admin(
        &pool,
        &AdminSeed {
            username: existing.username.clone(),
            password: PASSWORD.into(),
        },
    )
    .await
    .unwrap();

    let user = db::get_user(&pool, existing.id).await.unwrap().unwrap();
    assert_eq!(user.role, Role::Admin);
}
