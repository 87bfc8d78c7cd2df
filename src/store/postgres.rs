//! Postgres backend.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    Connection, PgPool, Row,
};
use std::time::Duration;
use tracing::{info_span, Instrument, Span};

use super::{AuthoredMessage, Store, StoreError};
use crate::models::{Follows, Message, NewMessage, NewUser, User};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const USER_COLUMNS: &str = "id, email, username, image_url, password";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a small pool to `dsn`.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tables and indexes if they do not exist yet.
    ///
    /// # Errors
    /// Returns an error if any schema statement fails.
    pub async fn apply_schema(&self) -> Result<()> {
        let mut connection = self
            .pool
            .acquire()
            .await
            .context("failed to acquire connection for schema setup")?;

        for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
            sqlx::query(statement)
                .execute(&mut *connection)
                .await
                .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
        }

        Ok(())
    }
}

/// Split a schema file into statements terminated by `;` at end of line.
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

fn db_span(operation: &str, statement: &str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

/// Map Postgres constraint violations onto [`StoreError`] variants.
fn map_db_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let constraint = db_err.constraint().unwrap_or_default().to_string();
        match db_err.code().as_deref() {
            Some("23505") => return StoreError::UniqueViolation(constraint),
            Some("23503") => return StoreError::ForeignKeyViolation(constraint),
            Some("23514") => return StoreError::CheckViolation(constraint),
            _ => {}
        }
    }
    StoreError::Database(err)
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        image_url: row.get("image_url"),
        password: row.get("password"),
    }
}

fn message_from_row(row: &PgRow) -> Message {
    Message {
        id: row.get("id"),
        text: row.get("text"),
        timestamp: row.get("timestamp"),
        user_id: row.get("user_id"),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .instrument(info_span!(
                "db.acquire",
                db.system = "postgresql",
                db.operation = "ACQUIRE"
            ))
            .await?;
        conn.ping()
            .instrument(info_span!(
                "db.ping",
                db.system = "postgresql",
                db.operation = "PING"
            ))
            .await?;
        Ok(())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let query = r"
            INSERT INTO users (email, username, image_url, password)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, username, image_url, password
        ";
        let row = sqlx::query(query)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.image_url)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .map_err(map_db_error)?;
        Ok(user_from_row(&row))
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = sqlx::query(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn search_users(&self, search: Option<&str>) -> Result<Vec<User>, StoreError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE $1::text IS NULL OR strpos(lower(username), lower($1)) > 0
             ORDER BY id"
        );
        let rows = sqlx::query(&query)
            .bind(search)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await?;
        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        // messages, follows and user_sessions cascade
        let query = "DELETE FROM users WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_follow(&self, follows: Follows) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO follows (user_being_followed_id, user_following_id)
            VALUES ($1, $2)
        ";
        sqlx::query(query)
            .bind(follows.user_being_followed_id)
            .bind(follows.user_following_id)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    async fn delete_follow(&self, follows: Follows) -> Result<bool, StoreError> {
        let query = r"
            DELETE FROM follows
            WHERE user_being_followed_id = $1 AND user_following_id = $2
        ";
        let result = sqlx::query(query)
            .bind(follows.user_being_followed_id)
            .bind(follows.user_following_id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn follow_exists(&self, follows: Follows) -> Result<bool, StoreError> {
        let query = r"
            SELECT EXISTS(
                SELECT 1 FROM follows
                WHERE user_being_followed_id = $1 AND user_following_id = $2
            ) AS exists
        ";
        let row = sqlx::query(query)
            .bind(follows.user_being_followed_id)
            .bind(follows.user_following_id)
            .fetch_one(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        Ok(row.get("exists"))
    }

    async fn followers(&self, user_id: i64) -> Result<Vec<User>, StoreError> {
        let query = r"
            SELECT u.id, u.email, u.username, u.image_url, u.password
            FROM users u
            JOIN follows f ON f.user_following_id = u.id
            WHERE f.user_being_followed_id = $1
            ORDER BY u.id
        ";
        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn following(&self, user_id: i64) -> Result<Vec<User>, StoreError> {
        let query = r"
            SELECT u.id, u.email, u.username, u.image_url, u.password
            FROM users u
            JOIN follows f ON f.user_being_followed_id = u.id
            WHERE f.user_following_id = $1
            ORDER BY u.id
        ";
        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn insert_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        let query = r"
            INSERT INTO messages (text, user_id)
            VALUES ($1, $2)
            RETURNING id, text, timestamp, user_id
        ";
        let row = sqlx::query(query)
            .bind(&message.text)
            .bind(message.user_id)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .map_err(map_db_error)?;
        Ok(message_from_row(&row))
    }

    async fn message_by_id(&self, id: i64) -> Result<Option<Message>, StoreError> {
        let query = "SELECT id, text, timestamp, user_id FROM messages WHERE id = $1";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        Ok(row.as_ref().map(message_from_row))
    }

    async fn messages_by_user(&self, user_id: i64) -> Result<Vec<Message>, StoreError> {
        let query = r"
            SELECT id, text, timestamp, user_id FROM messages
            WHERE user_id = $1
            ORDER BY timestamp DESC, id DESC
        ";
        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        Ok(rows.iter().map(message_from_row).collect())
    }

    async fn timeline(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<AuthoredMessage>, StoreError> {
        let query = r"
            SELECT m.id, m.text, m.timestamp, m.user_id,
                   u.email, u.username, u.image_url, u.password
            FROM messages m
            JOIN users u ON u.id = m.user_id
            WHERE m.user_id = $1
               OR m.user_id IN (
                   SELECT user_being_followed_id FROM follows WHERE user_following_id = $1
               )
            ORDER BY m.timestamp DESC, m.id DESC
            LIMIT $2
        ";
        let rows = sqlx::query(query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        Ok(rows
            .iter()
            .map(|row| AuthoredMessage {
                message: message_from_row(row),
                author: User {
                    id: row.get("user_id"),
                    email: row.get("email"),
                    username: row.get("username"),
                    image_url: row.get("image_url"),
                    password: row.get("password"),
                },
            })
            .collect())
    }

    async fn delete_message(&self, id: i64) -> Result<bool, StoreError> {
        let query = "DELETE FROM messages WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_session(
        &self,
        session_hash: &[u8],
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO user_sessions (session_hash, user_id, expires_at)
            VALUES ($1, $2, $3)
        ";
        sqlx::query(query)
            .bind(session_hash)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    async fn session_user_id(&self, session_hash: &[u8]) -> Result<Option<i64>, StoreError> {
        let query = r"
            SELECT user_id FROM user_sessions
            WHERE session_hash = $1 AND expires_at > NOW()
        ";
        let row = sqlx::query(query)
            .bind(session_hash)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        Ok(row.map(|row| row.get("user_id")))
    }

    async fn delete_session(&self, session_hash: &[u8]) -> Result<bool, StoreError> {
        let query = "DELETE FROM user_sessions WHERE session_hash = $1";
        let result = sqlx::query(query)
            .bind(session_hash)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
