//! Runs against a real database only when `WARBLER_TEST_DSN` is set.

use chrono::{Duration, Utc};
use ulid::Ulid;
use warbler::{
    models::{Follows, Message, NewUser, User},
    store::{constraint, PgStore, Store, StoreError},
};

async fn store() -> Option<PgStore> {
    let Ok(dsn) = std::env::var("WARBLER_TEST_DSN") else {
        eprintln!("WARBLER_TEST_DSN not set, skipping");
        return None;
    };
    let store = PgStore::connect(&dsn).await.unwrap();
    store.apply_schema().await.unwrap();
    Some(store)
}

async fn user(store: &PgStore, prefix: &str) -> User {
    let suffix = Ulid::new().to_string().to_lowercase();
    store
        .insert_user(NewUser {
            email: format!("{prefix}-{suffix}@test.com"),
            username: format!("{prefix}-{suffix}"),
            password_hash: "HASHED_PASSWORD".to_string(),
            image_url: None,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn unique_constraints_are_named() {
    let Some(store) = store().await else { return };
    let u = user(&store, "unique").await;

    let err = store
        .insert_user(NewUser {
            email: format!("other-{}", u.email),
            username: u.username.clone(),
            password_hash: "HASHED_PASSWORD".to_string(),
            image_url: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::UniqueViolation(_)));
    assert_eq!(err.constraint(), Some(constraint::USERS_USERNAME));

    u.delete(&store).await.unwrap();
}

#[tokio::test]
async fn follows_constraints() {
    let Some(store) = store().await else { return };
    let u = user(&store, "follower").await;
    let u2 = user(&store, "followed").await;

    store.insert_follow(Follows::new(u.id, u2.id)).await.unwrap();
    assert!(u.is_following(&store, &u2).await.unwrap());
    assert!(!u2.is_following(&store, &u).await.unwrap());

    let err = store
        .insert_follow(Follows::new(u.id, u2.id))
        .await
        .unwrap_err();
    assert_eq!(err.constraint(), Some(constraint::FOLLOWS_PKEY));

    let err = store
        .insert_follow(Follows::new(u.id, u.id))
        .await
        .unwrap_err();
    assert_eq!(err.constraint(), Some(constraint::FOLLOWS_NO_SELF));

    u.delete(&store).await.unwrap();
    u2.delete(&store).await.unwrap();
}

#[tokio::test]
async fn delete_user_cascades() {
    let Some(store) = store().await else { return };
    let u = user(&store, "cascade").await;
    let u2 = user(&store, "cascade2").await;
    let message = Message::create(&store, u.id, "gone soon").await.unwrap();
    store.insert_follow(Follows::new(u2.id, u.id)).await.unwrap();
    store
        .insert_session(&[7; 32], u.id, Utc::now() + Duration::hours(1))
        .await
        .unwrap();

    assert!(u.delete(&store).await.unwrap());

    assert_eq!(Message::find(&store, message.id).await.unwrap(), None);
    assert!(u2.following(&store).await.unwrap().is_empty());
    assert_eq!(store.session_user_id(&[7; 32]).await.unwrap(), None);

    u2.delete(&store).await.unwrap();
}

#[tokio::test]
async fn expired_sessions_do_not_resolve() {
    let Some(store) = store().await else { return };
    let u = user(&store, "session").await;
    let hash = Ulid::new().to_bytes();

    store
        .insert_session(&hash, u.id, Utc::now() - Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(store.session_user_id(&hash).await.unwrap(), None);

    u.delete(&store).await.unwrap();
}

#[tokio::test]
async fn timeline_orders_newest_first() {
    let Some(store) = store().await else { return };
    let u = user(&store, "timeline").await;
    let u2 = user(&store, "timeline2").await;
    u.follow(&store, &u2).await.unwrap();

    Message::create(&store, u.id, "first").await.unwrap();
    Message::create(&store, u2.id, "second").await.unwrap();

    let timeline = Message::timeline(&store, u.id).await.unwrap();
    let texts: Vec<&str> = timeline
        .iter()
        .map(|entry| entry.message.text.as_str())
        .collect();
    assert_eq!(texts, vec!["second", "first"]);
    assert_eq!(timeline[0].author, u2);

    u.delete(&store).await.unwrap();
    u2.delete(&store).await.unwrap();
}
