//! # Warbler
//!
//! A small social network: accounts, directed follow relationships and short
//! messages, rendered as server-side HTML behind a cookie session.
//!
//! ## Data model
//!
//! - **Users** have a unique username and a unique email. Passwords are stored
//!   as Argon2id PHC strings, never in clear text.
//! - **Messages** belong to exactly one user and are removed with their owner.
//! - **Follows** rows are directed edges: `(being_followed = B, following = A)`
//!   means "A follows B". A user can never follow itself.
//!
//! ## Authentication
//!
//! Signup and login issue a random session token in the `warbler_session`
//! cookie; only its SHA-256 hash is persisted. Handlers that list follow
//! relationships or mutate state require a session. Anonymous requests are
//! redirected to `/` with an "Access unauthorized." notice and nothing changes.
//!
//! Signup reports malformed input as a [`models::ValidationError`], while
//! [`models::User::authenticate`] reports a bad username or password as
//! `Ok(None)`.

pub mod cli;
pub mod credentials;
pub mod models;
pub mod store;
pub mod warbler;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
