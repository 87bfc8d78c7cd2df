use chrono::{DateTime, Utc};

use crate::store::{AuthoredMessage, Store, StoreError};

/// Longest message accepted, in characters.
pub const MAX_MESSAGE_LEN: usize = 140;

/// Number of messages shown on the home timeline.
pub const TIMELINE_LIMIT: i64 = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: i64,
}

/// Insert payload; the store assigns `id` and `timestamp`.
#[derive(Clone, Debug)]
pub struct NewMessage {
    pub user_id: i64,
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Message must be between 1 and 140 characters.")]
    InvalidText,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Message {
    /// Post `text` as `owner_id`.
    ///
    /// # Errors
    /// Returns [`MessageError::InvalidText`] for empty or over-long text.
    pub async fn create(
        store: &dyn Store,
        owner_id: i64,
        text: &str,
    ) -> Result<Self, MessageError> {
        let text = text.trim();
        let length = text.chars().count();
        if length == 0 || length > MAX_MESSAGE_LEN {
            return Err(MessageError::InvalidText);
        }
        let message = store
            .insert_message(NewMessage {
                user_id: owner_id,
                text: text.to_string(),
            })
            .await?;
        Ok(message)
    }

    /// # Errors
    /// Returns an error if the store fails.
    pub async fn find(store: &dyn Store, id: i64) -> Result<Option<Self>, StoreError> {
        store.message_by_id(id).await
    }

    /// # Errors
    /// Returns an error if the store fails.
    pub async fn delete(&self, store: &dyn Store) -> Result<bool, StoreError> {
        store.delete_message(self.id).await
    }

    /// Newest messages by `user_id` and the users they follow.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn timeline(
        store: &dyn Store,
        user_id: i64,
    ) -> Result<Vec<AuthoredMessage>, StoreError> {
        store.timeline(user_id, TIMELINE_LIMIT).await
    }

    #[must_use]
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::store::MemoryStore;

    async fn owner(store: &MemoryStore) -> i64 {
        store
            .insert_user(NewUser {
                email: "owner@test.com".to_string(),
                username: "owner".to_string(),
                password_hash: "HASHED_PASSWORD".to_string(),
                image_url: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn create_trims_and_timestamps() {
        let store = MemoryStore::new();
        let owner_id = owner(&store).await;
        let before = Utc::now();
        let message = Message::create(&store, owner_id, "  hello  ").await.unwrap();
        assert_eq!(message.text, "hello");
        assert!(message.timestamp >= before);
        assert!(message.is_owned_by(owner_id));
        assert_eq!(Message::find(&store, message.id).await.unwrap(), Some(message));
    }

    #[tokio::test]
    async fn create_rejects_empty_and_long_text() {
        let store = MemoryStore::new();
        let owner_id = owner(&store).await;
        assert!(matches!(
            Message::create(&store, owner_id, "   ").await,
            Err(MessageError::InvalidText)
        ));
        let long = "x".repeat(MAX_MESSAGE_LEN + 1);
        assert!(matches!(
            Message::create(&store, owner_id, &long).await,
            Err(MessageError::InvalidText)
        ));
        let exact = "é".repeat(MAX_MESSAGE_LEN);
        assert!(Message::create(&store, owner_id, &exact).await.is_ok());
    }

    #[tokio::test]
    async fn delete_removes_message() {
        let store = MemoryStore::new();
        let owner_id = owner(&store).await;
        let message = Message::create(&store, owner_id, "bye").await.unwrap();
        assert!(message.delete(&store).await.unwrap());
        assert_eq!(Message::find(&store, message.id).await.unwrap(), None);
        assert!(!message.delete(&store).await.unwrap());
    }
}
