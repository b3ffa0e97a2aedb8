//! Postgres store tests. Run with `DATABASE_URL` set and `--ignored`.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use turnstile_db::models::session::CreateRefreshSession;
use turnstile_db::models::user::CreateUser;
use turnstile_db::store::{PgSessionStore, PgUserStore, SessionStore, StoreError, UserStore};

fn session_input(user_id: i64, expires_in: Duration) -> CreateRefreshSession {
    CreateRefreshSession {
        user_id,
        secret_hash: "0".repeat(64),
        expires_at: Utc::now() + expires_in,
    }
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_is_single_use(pool: PgPool) {
    let store = PgSessionStore::new(pool);
    let session = store
        .create(&session_input(1, Duration::days(7)))
        .await
        .unwrap();

    assert!(store.find_by_id(session.id).await.unwrap().is_some());
    assert!(store.delete_by_id(session.id).await.unwrap());
    assert!(!store.delete_by_id(session.id).await.unwrap());
    assert!(store.find_by_id(session.id).await.unwrap().is_none());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_expired_rows_hidden_and_swept(pool: PgPool) {
    let store = PgSessionStore::new(pool);
    let expired = store
        .create(&session_input(1, Duration::seconds(-5)))
        .await
        .unwrap();
    let live = store
        .create(&session_input(1, Duration::days(1)))
        .await
        .unwrap();

    assert!(store.find_by_id(expired.id).await.unwrap().is_none());
    assert_eq!(store.delete_expired().await.unwrap(), 1);
    assert!(store.find_by_id(live.id).await.unwrap().is_some());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_all_for_user(pool: PgPool) {
    let store = PgSessionStore::new(pool);
    for _ in 0..3 {
        store
            .create(&session_input(7, Duration::days(1)))
            .await
            .unwrap();
    }
    let other = store
        .create(&session_input(8, Duration::days(1)))
        .await
        .unwrap();

    assert_eq!(store.delete_all_for_user(7).await.unwrap(), 3);
    assert!(store.find_by_id(other.id).await.unwrap().is_some());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_email_maps_to_store_error(pool: PgPool) {
    let store = PgUserStore::new(pool);
    let input = CreateUser {
        email: "a@b.com".to_string(),
        password_hash: "hash".to_string(),
    };

    store.create(&input).await.unwrap();
    let result = store.create(&input).await;
    assert!(matches!(result, Err(StoreError::DuplicateEmail)));
}
