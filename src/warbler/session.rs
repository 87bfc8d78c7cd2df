//! Cookie sessions: the session token maps to the current user's id.
//!
//! The raw token only ever lives in the client's cookie; the store keeps its
//! SHA-256 hash.

use anyhow::{anyhow, Context, Result};
use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64::Engine;
use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use tracing::{debug, error};

use super::state::AuthConfig;
use crate::{
    models::User,
    store::{Store, StoreError},
};

pub const SESSION_COOKIE_NAME: &str = "warbler_session";

/// Create a new session token for the auth cookie.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Log `user_id` in: persist a fresh session and return the raw token for the cookie.
///
/// # Errors
/// Returns an error if the session ttl overflows the expiry timestamp, or if
/// no token could be generated or stored.
pub async fn create_session(store: &dyn Store, config: &AuthConfig, user_id: i64) -> Result<String> {
    let ttl_seconds = config.session_ttl_seconds();
    let expires_at = Duration::try_seconds(ttl_seconds)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| anyhow!("session ttl out of range: {ttl_seconds}s"))?;

    // A hash collision is astronomically unlikely, retry a few times anyway.
    for _ in 0..3 {
        let token = generate_session_token()?;
        let token_hash = hash_session_token(&token);
        match store.insert_session(&token_hash, user_id, expires_at).await {
            Ok(()) => {
                debug!(user_id, "session created");
                return Ok(token);
            }
            Err(StoreError::UniqueViolation(_)) => continue,
            Err(err) => return Err(err).context("failed to insert session"),
        }
    }

    Err(anyhow!("failed to create a unique session token"))
}

/// Resolve the session cookie to the logged-in user, if any.
///
/// # Errors
/// Returns an error if the store fails.
pub async fn current_user(headers: &HeaderMap, store: &dyn Store) -> Result<Option<User>, StoreError> {
    let Some(token) = cookie_value(headers, SESSION_COOKIE_NAME) else {
        return Ok(None);
    };
    let token_hash = hash_session_token(&token);
    let Some(user_id) = store.session_user_id(&token_hash).await? else {
        return Ok(None);
    };
    store.user_by_id(user_id).await
}

/// Forget the session named by the cookie, if any.
pub async fn destroy_session(headers: &HeaderMap, store: &dyn Store) {
    if let Some(token) = cookie_value(headers, SESSION_COOKIE_NAME) {
        let token_hash = hash_session_token(&token);
        if let Err(err) = store.delete_session(&token_hash).await {
            error!("Failed to delete session: {err}");
        }
    }
}

/// Build a `HttpOnly` cookie for the session token.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Value of the cookie `name`, if present and non-empty.
pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let key = parts.next()?.trim();
            let val = parts.next()?.trim();
            (key == name && !val.is_empty()).then(|| val.to_string())
        })
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{store::MemoryStore, warbler::state::MAX_SESSION_TTL_SECONDS};
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    #[test]
    fn generate_session_token_is_32_random_bytes() {
        let token = generate_session_token().unwrap();
        let decoded = URL_SAFE_NO_PAD.decode(token.as_bytes()).unwrap();
        assert_eq!(decoded.len(), 32);
        assert_ne!(token, generate_session_token().unwrap());
    }

    #[test]
    fn hash_session_token_stable() {
        assert_eq!(hash_session_token("token"), hash_session_token("token"));
        assert_ne!(hash_session_token("token"), hash_session_token("other"));
        assert_eq!(hash_session_token("token").len(), 32);
    }

    #[test]
    fn cookie_value_finds_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; warbler_session=abc123; other=x"),
        );
        assert_eq!(
            cookie_value(&headers, SESSION_COOKIE_NAME),
            Some("abc123".to_string())
        );
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn cookie_value_ignores_empty_values() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("warbler_session="));
        assert_eq!(cookie_value(&headers, SESSION_COOKIE_NAME), None);
    }

    #[test]
    fn session_cookie_flags() {
        let config = AuthConfig::new().with_session_ttl_seconds(60);
        let cookie = session_cookie(&config, "tok").unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "warbler_session=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );

        let secure = AuthConfig::new().with_session_cookie_secure(true);
        let cleared = clear_session_cookie(&secure).unwrap();
        assert!(cleared.to_str().unwrap().ends_with("Max-Age=0; Secure"));
    }

    #[tokio::test]
    async fn session_round_trip() {
        let store = MemoryStore::new();
        let user = store
            .insert_user(crate::models::NewUser {
                email: "a@test.com".to_string(),
                username: "a".to_string(),
                password_hash: "HASHED_PASSWORD".to_string(),
                image_url: None,
            })
            .await
            .unwrap();

        let token = create_session(&store, &AuthConfig::new(), user.id)
            .await
            .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{SESSION_COOKIE_NAME}={token}")).unwrap(),
        );
        assert_eq!(current_user(&headers, &store).await.unwrap(), Some(user));

        destroy_session(&headers, &store).await;
        assert_eq!(current_user(&headers, &store).await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_session_is_anonymous() {
        let store = MemoryStore::new();
        let user = store
            .insert_user(crate::models::NewUser {
                email: "a@test.com".to_string(),
                username: "a".to_string(),
                password_hash: "HASHED_PASSWORD".to_string(),
                image_url: None,
            })
            .await
            .unwrap();
        let config = AuthConfig::new().with_session_ttl_seconds(-1);
        let token = create_session(&store, &config, user.id).await.unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{SESSION_COOKIE_NAME}={token}")).unwrap(),
        );
        assert_eq!(current_user(&headers, &store).await.unwrap(), None);
    }

    #[tokio::test]
    async fn oversized_ttl_is_an_error() {
        let store = MemoryStore::new();
        let user = store
            .insert_user(crate::models::NewUser {
                email: "a@test.com".to_string(),
                username: "a".to_string(),
                password_hash: "HASHED_PASSWORD".to_string(),
                image_url: None,
            })
            .await
            .unwrap();

        for ttl in [i64::MAX, 9_000_000_000_000] {
            let config = AuthConfig::new().with_session_ttl_seconds(ttl);
            assert!(create_session(&store, &config, user.id).await.is_err());
        }

        let config = AuthConfig::new().with_session_ttl_seconds(MAX_SESSION_TTL_SECONDS);
        let token = create_session(&store, &config, user.id).await.unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{SESSION_COOKIE_NAME}={token}")).unwrap(),
        );
        assert_eq!(current_user(&headers, &store).await.unwrap(), Some(user));
    }
}
