pub mod auth;
pub mod health;
pub mod home;
pub mod messages;
pub mod users;

use axum::{http::StatusCode, response::Response};

use super::{error::ViewError, html, visitor::Visitor};
use crate::{
    models::User,
    store::{Store, StoreError},
};

/// Collect the counts and follow state for a profile header.
pub(crate) async fn load_profile<'a>(
    store: &dyn Store,
    user: &'a User,
    viewer: Option<&User>,
) -> Result<html::Profile<'a>, StoreError> {
    let messages = user.messages(store).await?.len();
    let following = user.following(store).await?.len();
    let followers = user.followers(store).await?.len();

    let is_viewer = viewer.is_some_and(|viewer| viewer.id == user.id);
    let viewer_follows = match viewer {
        Some(viewer) if !is_viewer => Some(viewer.is_following(store, user).await?),
        _ => None,
    };

    Ok(html::Profile {
        user,
        messages,
        following,
        followers,
        viewer_follows,
        is_viewer,
    })
}

/// Load the user behind a path id, or 404.
pub(crate) async fn find_user(store: &dyn Store, id: i64) -> Result<User, ViewError> {
    User::find(store, id).await?.ok_or(ViewError::NotFound)
}

/// Fallback for unknown routes.
pub async fn not_found(visitor: Visitor) -> Response {
    html::render(
        &visitor,
        StatusCode::NOT_FOUND,
        "Page not found",
        r#"<div class="error-page"><h1>404</h1><h2>Page not found</h2><p>The page you are looking for does not exist.</p><a href="/">Go home</a></div>"#,
    )
}
