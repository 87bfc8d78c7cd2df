//! In-process backend with the same constraints as the Postgres schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

use super::{constraint, AuthoredMessage, Store, StoreError};
use crate::models::{Follows, Message, NewMessage, NewUser, User};

#[derive(Debug, Default)]
struct Tables {
    next_user_id: i64,
    next_message_id: i64,
    users: BTreeMap<i64, User>,
    messages: BTreeMap<i64, Message>,
    // (user_being_followed_id, user_following_id)
    follows: BTreeSet<(i64, i64)>,
    sessions: HashMap<Vec<u8>, (i64, DateTime<Utc>)>,
}

impl Tables {
    fn users_where(&self, mut keep: impl FnMut(&User) -> bool) -> Vec<User> {
        self.users.values().filter(|u| keep(u)).cloned().collect()
    }

    fn messages_newest_first(&self, mut keep: impl FnMut(&Message) -> bool) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .messages
            .values()
            .filter(|m| keep(m))
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        messages
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation(constraint::USERS_EMAIL.to_string()));
        }
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::UniqueViolation(
                constraint::USERS_USERNAME.to_string(),
            ));
        }
        tables.next_user_id += 1;
        let row = User {
            id: tables.next_user_id,
            email: user.email,
            username: user.username,
            image_url: user.image_url,
            password: user.password_hash,
        };
        tables.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn search_users(&self, query: Option<&str>) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        let needle = query.map(str::to_lowercase);
        Ok(tables.users_where(|u| {
            needle
                .as_deref()
                .map_or(true, |needle| u.username.to_lowercase().contains(needle))
        }))
    }

    async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.messages.retain(|_, m| m.user_id != id);
        tables
            .follows
            .retain(|&(followed, following)| followed != id && following != id);
        tables.sessions.retain(|_, (user_id, _)| *user_id != id);
        Ok(true)
    }

    async fn insert_follow(&self, follows: Follows) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let key = (follows.user_being_followed_id, follows.user_following_id);
        if !tables.users.contains_key(&key.0) || !tables.users.contains_key(&key.1) {
            return Err(StoreError::ForeignKeyViolation("follows_user_fkey".to_string()));
        }
        if key.0 == key.1 {
            return Err(StoreError::CheckViolation(
                constraint::FOLLOWS_NO_SELF.to_string(),
            ));
        }
        if !tables.follows.insert(key) {
            return Err(StoreError::UniqueViolation(
                constraint::FOLLOWS_PKEY.to_string(),
            ));
        }
        Ok(())
    }

    async fn delete_follow(&self, follows: Follows) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .follows
            .remove(&(follows.user_being_followed_id, follows.user_following_id)))
    }

    async fn follow_exists(&self, follows: Follows) -> Result<bool, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .contains(&(follows.user_being_followed_id, follows.user_following_id)))
    }

    async fn followers(&self, user_id: i64) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users_where(|u| tables.follows.contains(&(user_id, u.id))))
    }

    async fn following(&self, user_id: i64) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users_where(|u| tables.follows.contains(&(u.id, user_id))))
    }

    async fn insert_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&message.user_id) {
            return Err(StoreError::ForeignKeyViolation(
                "messages_user_id_fkey".to_string(),
            ));
        }
        tables.next_message_id += 1;
        let row = Message {
            id: tables.next_message_id,
            text: message.text,
            timestamp: Utc::now(),
            user_id: message.user_id,
        };
        tables.messages.insert(row.id, row.clone());
        Ok(row)
    }

    async fn message_by_id(&self, id: i64) -> Result<Option<Message>, StoreError> {
        Ok(self.tables.read().await.messages.get(&id).cloned())
    }

    async fn messages_by_user(&self, user_id: i64) -> Result<Vec<Message>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.messages_newest_first(|m| m.user_id == user_id))
    }

    async fn timeline(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<AuthoredMessage>, StoreError> {
        let tables = self.tables.read().await;
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(tables
            .messages_newest_first(|m| {
                m.user_id == user_id || tables.follows.contains(&(m.user_id, user_id))
            })
            .into_iter()
            .take(limit)
            .filter_map(|message| {
                let author = tables.users.get(&message.user_id)?.clone();
                Some(AuthoredMessage { message, author })
            })
            .collect())
    }

    async fn delete_message(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.messages.remove(&id).is_some())
    }

    async fn insert_session(
        &self,
        session_hash: &[u8],
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::ForeignKeyViolation(
                "user_sessions_user_id_fkey".to_string(),
            ));
        }
        if tables.sessions.contains_key(session_hash) {
            return Err(StoreError::UniqueViolation(
                "user_sessions_pkey".to_string(),
            ));
        }
        tables
            .sessions
            .insert(session_hash.to_vec(), (user_id, expires_at));
        Ok(())
    }

    async fn session_user_id(&self, session_hash: &[u8]) -> Result<Option<i64>, StoreError> {
        let tables = self.tables.read().await;
        let now = Utc::now();
        Ok(tables
            .sessions
            .get(session_hash)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(user_id, _)| *user_id))
    }

    async fn delete_session(&self, session_hash: &[u8]) -> Result<bool, StoreError> {
        Ok(self
            .tables
            .write()
            .await
            .sessions
            .remove(session_hash)
            .is_some())
    }
}
