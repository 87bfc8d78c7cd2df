mod common;

use common::{cheap_credentials, signup};
use warbler::{
    models::{
        FollowError, Follows, Message, NewUser, SignupError, SignupForm, User, ValidationError,
        DEFAULT_IMAGE_URL,
    },
    store::{MemoryStore, Store},
};

async fn raw_user(store: &dyn Store, username: &str, email: &str) -> User {
    store
        .insert_user(NewUser {
            email: email.to_string(),
            username: username.to_string(),
            password_hash: "HASHED_PASSWORD".to_string(),
            image_url: None,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn user_model_basics() {
    let store = MemoryStore::new();
    let u = raw_user(&store, "testuser", "test@test.com").await;
    let u2 = raw_user(&store, "testuser2", "test2@test.com").await;

    // no messages & no followers yet
    assert!(u.messages(&store).await.unwrap().is_empty());
    assert!(u.followers(&store).await.unwrap().is_empty());

    assert_eq!(u.to_string(), format!("<User #{}: testuser, test@test.com>", u.id));
    assert_eq!(
        u2.to_string(),
        format!("<User #{}: testuser2, test2@test.com>", u2.id)
    );
    assert_eq!(u.image(), DEFAULT_IMAGE_URL);
}

#[tokio::test]
async fn following_is_directed() {
    let store = MemoryStore::new();
    let u = raw_user(&store, "testuser", "test@test.com").await;
    let u2 = raw_user(&store, "testuser2", "test2@test.com").await;

    assert!(!u.is_followed_by(&store, &u2).await.unwrap());
    assert!(!u2.is_followed_by(&store, &u).await.unwrap());

    // u follows u2
    store.insert_follow(Follows::new(u.id, u2.id)).await.unwrap();

    assert!(u2.followers(&store).await.unwrap().contains(&u));
    assert!(u.following(&store).await.unwrap().contains(&u2));
    assert!(!u.is_followed_by(&store, &u2).await.unwrap());
    assert!(u2.is_followed_by(&store, &u).await.unwrap());
    assert!(u.is_following(&store, &u2).await.unwrap());
    assert!(!u2.is_following(&store, &u).await.unwrap());
}

#[tokio::test]
async fn follow_and_unfollow() {
    let store = MemoryStore::new();
    let u = raw_user(&store, "testuser", "test@test.com").await;
    let u2 = raw_user(&store, "testuser2", "test2@test.com").await;

    u.follow(&store, &u2).await.unwrap();
    // following twice is a no-op
    u.follow(&store, &u2).await.unwrap();
    assert_eq!(u2.followers(&store).await.unwrap(), vec![u.clone()]);

    u2.follow(&store, &u).await.unwrap();
    assert!(u.unfollow(&store, &u2).await.unwrap());
    assert!(!u.unfollow(&store, &u2).await.unwrap());
    assert!(u2.is_following(&store, &u).await.unwrap());

    assert!(matches!(
        u.follow(&store, &u).await,
        Err(FollowError::SelfFollow)
    ));
}

#[tokio::test]
async fn user_signup() {
    let store = MemoryStore::new();
    let u = signup(&store, "testy", "testy@gmail.com", "password").await;

    assert_eq!(u.to_string(), format!("<User #{}: testy, testy@gmail.com>", u.id));
    assert_ne!(u.password, "password");
    assert!(u.password.starts_with("$argon2id$"));

    let err = User::signup(
        &store,
        &cheap_credentials(),
        SignupForm {
            username: "testy2".to_string(),
            email: "testy2@gmail.com".to_string(),
            password: String::new(),
            image_url: Some(String::new()),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        SignupError::Validation(ValidationError::MissingPassword)
    ));
    assert_eq!(User::search(&store, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn signup_rejects_duplicates() {
    let store = MemoryStore::new();
    signup(&store, "testy", "testy@gmail.com", "password").await;

    let form = |username: &str, email: &str| SignupForm {
        username: username.to_string(),
        email: email.to_string(),
        password: "password".to_string(),
        image_url: None,
    };

    let err = User::signup(&store, &cheap_credentials(), form("testy", "other@gmail.com"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SignupError::Validation(ValidationError::UsernameTaken)
    ));

    let err = User::signup(&store, &cheap_credentials(), form("other", "TESTY@gmail.com"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SignupError::Validation(ValidationError::EmailTaken)
    ));

    let err = User::signup(&store, &cheap_credentials(), form("other", "not-an-email"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SignupError::Validation(ValidationError::InvalidEmail)
    ));

    assert_eq!(User::search(&store, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn user_authenticate() {
    let store = MemoryStore::new();
    let credentials = cheap_credentials();
    let u = signup(&store, "testy", "testy@gmail.com", "password").await;

    let user = User::authenticate(&store, &credentials, "testy", "password")
        .await
        .unwrap();
    assert_eq!(user, Some(u));

    let user = User::authenticate(&store, &credentials, "testy", "password123")
        .await
        .unwrap();
    assert_eq!(user, None);

    let user = User::authenticate(&store, &credentials, "badusername", "password")
        .await
        .unwrap();
    assert_eq!(user, None);
}

#[tokio::test]
async fn search_is_case_insensitive() {
    let store = MemoryStore::new();
    raw_user(&store, "Alice", "alice@test.com").await;
    raw_user(&store, "bob", "bob@test.com").await;

    let found = User::search(&store, Some("ALI")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].username, "Alice");

    assert_eq!(User::search(&store, Some("  ")).await.unwrap().len(), 2);
}

#[tokio::test]
async fn delete_cascades() {
    let store = MemoryStore::new();
    let u = raw_user(&store, "testuser", "test@test.com").await;
    let u2 = raw_user(&store, "testuser2", "test2@test.com").await;
    let message = Message::create(&store, u.id, "bye").await.unwrap();
    u.follow(&store, &u2).await.unwrap();
    u2.follow(&store, &u).await.unwrap();

    assert!(u.delete(&store).await.unwrap());

    assert_eq!(User::find(&store, u.id).await.unwrap(), None);
    assert_eq!(Message::find(&store, message.id).await.unwrap(), None);
    assert!(u2.followers(&store).await.unwrap().is_empty());
    assert!(u2.following(&store).await.unwrap().is_empty());
}

#[tokio::test]
async fn timeline_shows_own_and_followed_messages() {
    let store = MemoryStore::new();
    let u = raw_user(&store, "testuser", "test@test.com").await;
    let u2 = raw_user(&store, "testuser2", "test2@test.com").await;
    let u3 = raw_user(&store, "testuser3", "test3@test.com").await;

    Message::create(&store, u.id, "mine").await.unwrap();
    Message::create(&store, u2.id, "followed").await.unwrap();
    Message::create(&store, u3.id, "stranger").await.unwrap();
    u.follow(&store, &u2).await.unwrap();

    let texts: Vec<String> = Message::timeline(&store, u.id)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.message.text)
        .collect();

    assert_eq!(texts, vec!["followed".to_string(), "mine".to_string()]);
}
