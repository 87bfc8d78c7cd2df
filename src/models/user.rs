use regex::Regex;
use std::fmt;
use tracing::debug;

use super::{Follows, Message};
use crate::credentials::{CredentialError, Credentials};
use crate::store::{constraint, Store, StoreError};

/// Shown when a user has no profile picture.
pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub image_url: Option<String>,
    /// Argon2id PHC string.
    pub password: String,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<User #{}: {}, {}>", self.id, self.username, self.email)
    }
}

/// Insert payload; the password is already hashed.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub image_url: Option<String>,
}

/// Raw signup input.
#[derive(Clone, Debug, Default)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Username is required.")]
    MissingUsername,
    #[error("Email is required.")]
    MissingEmail,
    #[error("Invalid email address.")]
    InvalidEmail,
    #[error("Password is required.")]
    MissingPassword,
    #[error("Username already taken.")]
    UsernameTaken,
    #[error("Email already registered.")]
    EmailTaken,
}

#[derive(Debug, thiserror::Error)]
pub enum SignupError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for SignupError {
    fn from(err: StoreError) -> Self {
        match err.constraint() {
            Some(constraint::USERS_USERNAME) => Self::Validation(ValidationError::UsernameTaken),
            Some(constraint::USERS_EMAIL) => Self::Validation(ValidationError::EmailTaken),
            _ => Self::Store(err),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FollowError {
    #[error("You cannot follow yourself.")]
    SelfFollow,
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

impl User {
    /// Create an account with a hashed password.
    ///
    /// # Errors
    /// Returns [`SignupError::Validation`] for empty fields, a malformed email,
    /// or a username/email that is already registered. Nothing is stored in
    /// that case.
    pub async fn signup(
        store: &dyn Store,
        credentials: &Credentials,
        form: SignupForm,
    ) -> Result<Self, SignupError> {
        let username = form.username.trim();
        let email = normalize_email(&form.email);

        if username.is_empty() {
            return Err(ValidationError::MissingUsername.into());
        }
        if email.is_empty() {
            return Err(ValidationError::MissingEmail.into());
        }
        if !valid_email(&email) {
            return Err(ValidationError::InvalidEmail.into());
        }
        if form.password.is_empty() {
            return Err(ValidationError::MissingPassword.into());
        }

        let password_hash = credentials.hash(&form.password)?;
        let image_url = form
            .image_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let user = store
            .insert_user(NewUser {
                email,
                username: username.to_string(),
                password_hash,
                image_url,
            })
            .await?;

        debug!(user_id = user.id, "user signed up");

        Ok(user)
    }

    /// Find the user with `username` and check `password`.
    ///
    /// Returns `Ok(None)` for an unknown username or a wrong password alike.
    ///
    /// # Errors
    /// Returns an error only if the store fails.
    pub async fn authenticate(
        store: &dyn Store,
        credentials: &Credentials,
        username: &str,
        password: &str,
    ) -> Result<Option<Self>, StoreError> {
        let Some(user) = store.user_by_username(username.trim()).await? else {
            return Ok(None);
        };
        if credentials.verify(password, &user.password) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// # Errors
    /// Returns an error if the store fails.
    pub async fn find(store: &dyn Store, id: i64) -> Result<Option<Self>, StoreError> {
        store.user_by_id(id).await
    }

    /// Users whose username contains `query`, case-insensitively. An empty
    /// query lists everyone.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn search(store: &dyn Store, query: Option<&str>) -> Result<Vec<Self>, StoreError> {
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        store.search_users(query).await
    }

    /// Profile picture, falling back to the default image.
    #[must_use]
    pub fn image(&self) -> &str {
        self.image_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_IMAGE_URL)
    }

    /// Whether `other` follows `self`.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn is_followed_by(&self, store: &dyn Store, other: &Self) -> Result<bool, StoreError> {
        store.follow_exists(Follows::new(other.id, self.id)).await
    }

    /// Whether `self` follows `other`.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn is_following(&self, store: &dyn Store, other: &Self) -> Result<bool, StoreError> {
        store.follow_exists(Follows::new(self.id, other.id)).await
    }

    /// # Errors
    /// Returns an error if the store fails.
    pub async fn followers(&self, store: &dyn Store) -> Result<Vec<Self>, StoreError> {
        store.followers(self.id).await
    }

    /// # Errors
    /// Returns an error if the store fails.
    pub async fn following(&self, store: &dyn Store) -> Result<Vec<Self>, StoreError> {
        store.following(self.id).await
    }

    /// Messages by this user, newest first.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn messages(&self, store: &dyn Store) -> Result<Vec<Message>, StoreError> {
        store.messages_by_user(self.id).await
    }

    /// Start following `other`. Following twice is a no-op.
    ///
    /// # Errors
    /// Returns [`FollowError::SelfFollow`] when `other` is `self`.
    pub async fn follow(&self, store: &dyn Store, other: &Self) -> Result<(), FollowError> {
        if self.id == other.id {
            return Err(FollowError::SelfFollow);
        }
        match store.insert_follow(Follows::new(self.id, other.id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.constraint() == Some(constraint::FOLLOWS_PKEY) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Stop following `other`. Returns whether an edge was removed.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn unfollow(&self, store: &dyn Store, other: &Self) -> Result<bool, StoreError> {
        store.delete_follow(Follows::new(self.id, other.id)).await
    }

    /// Remove the account with its messages, follows and sessions.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn delete(&self, store: &dyn Store) -> Result<bool, StoreError> {
        store.delete_user(self.id).await
    }
}
