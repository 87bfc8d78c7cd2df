//! Relational persistence for users, messages, follows and sessions.
//!
//! [`Store`] is the seam between the models and the database. [`PgStore`] is
//! the production backend; [`MemoryStore`] keeps the same constraints in
//! process and backs `memory://` deployments and the test suites.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::models::{Follows, Message, NewMessage, NewUser, User};

mod memory;
mod postgres;

pub use self::memory::MemoryStore;
pub use self::postgres::PgStore;

/// Shared handle used by the HTTP layer.
pub type DynStore = Arc<dyn Store>;

/// Constraint names, shared by both backends so callers can match on them.
pub mod constraint {
    pub const USERS_USERNAME: &str = "users_username_key";
    pub const USERS_EMAIL: &str = "users_email_key";
    pub const FOLLOWS_PKEY: &str = "follows_pkey";
    pub const FOLLOWS_NO_SELF: &str = "follows_no_self_follow";
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),
    #[error("check constraint violated: {0}")]
    CheckViolation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Name of the violated constraint, if this is a constraint error.
    #[must_use]
    pub fn constraint(&self) -> Option<&str> {
        match self {
            Self::UniqueViolation(name)
            | Self::ForeignKeyViolation(name)
            | Self::CheckViolation(name) => Some(name),
            Self::Database(_) => None,
        }
    }
}

/// A message joined with its author, as shown on timelines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthoredMessage {
    pub message: Message,
    pub author: User,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Liveness check used by `/health`.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn user_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    /// All users ordered by id, optionally filtered by a case-insensitive
    /// username substring.
    async fn search_users(&self, query: Option<&str>) -> Result<Vec<User>, StoreError>;
    /// Delete a user together with their messages, follows and sessions.
    async fn delete_user(&self, id: i64) -> Result<bool, StoreError>;

    async fn insert_follow(&self, follows: Follows) -> Result<(), StoreError>;
    async fn delete_follow(&self, follows: Follows) -> Result<bool, StoreError>;
    async fn follow_exists(&self, follows: Follows) -> Result<bool, StoreError>;
    /// Users following `user_id`, ordered by id.
    async fn followers(&self, user_id: i64) -> Result<Vec<User>, StoreError>;
    /// Users that `user_id` follows, ordered by id.
    async fn following(&self, user_id: i64) -> Result<Vec<User>, StoreError>;

    async fn insert_message(&self, message: NewMessage) -> Result<Message, StoreError>;
    async fn message_by_id(&self, id: i64) -> Result<Option<Message>, StoreError>;
    /// Messages by `user_id`, newest first.
    async fn messages_by_user(&self, user_id: i64) -> Result<Vec<Message>, StoreError>;
    /// Newest `limit` messages by `user_id` or anyone they follow.
    async fn timeline(&self, user_id: i64, limit: i64)
        -> Result<Vec<AuthoredMessage>, StoreError>;
    async fn delete_message(&self, id: i64) -> Result<bool, StoreError>;

    async fn insert_session(
        &self,
        session_hash: &[u8],
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    /// Resolve an unexpired session hash to its user id.
    async fn session_user_id(&self, session_hash: &[u8]) -> Result<Option<i64>, StoreError>;
    async fn delete_session(&self, session_hash: &[u8]) -> Result<bool, StoreError>;
}
