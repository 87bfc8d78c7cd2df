use axum::{
    extract::{rejection::PathRejection, Extension, Path, Query},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::IntoParams;

use super::{find_user, load_profile};
use crate::{
    models::{FollowError, User},
    store::DynStore,
    warbler::{
        error::ViewError,
        flash::{redirect, redirect_with_cookies, Flash},
        html,
        session::clear_session_cookie,
        state::AuthState,
        visitor::Visitor,
    },
};

#[derive(IntoParams, Deserialize, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive username fragment.
    q: Option<String>,
}

#[utoipa::path(
    get,
    path = "/users",
    params(SearchQuery),
    responses((status = 200, description = "User cards", content_type = "text/html", body = String)),
    tag = "users"
)]
pub async fn index(
    visitor: Visitor,
    Extension(store): Extension<DynStore>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, ViewError> {
    let users = User::search(store.as_ref(), query.q.as_deref()).await?;
    Ok(html::render(
        &visitor,
        StatusCode::OK,
        "Users",
        &html::users_index(&users, query.q.as_deref()),
    ))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Profile with the user's messages", content_type = "text/html", body = String),
        (status = 404, description = "No such user")
    ),
    tag = "users"
)]
pub async fn show(
    visitor: Visitor,
    Extension(store): Extension<DynStore>,
    Path(id): Path<i64>,
) -> Result<Response, ViewError> {
    let user = find_user(store.as_ref(), id).await?;
    let profile = load_profile(store.as_ref(), &user, visitor.user.as_ref()).await?;
    let messages = user.messages(store.as_ref()).await?;

    Ok(html::render(
        &visitor,
        StatusCode::OK,
        &user.username,
        &html::user_show(&profile, &messages),
    ))
}

#[utoipa::path(
    get,
    path = "/users/{id}/following",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Users this user follows", content_type = "text/html", body = String),
        (status = 303, description = "Not logged in, redirect to / with \"Access unauthorized.\""),
        (status = 404, description = "No such user")
    ),
    tag = "users"
)]
pub async fn following(
    visitor: Visitor,
    Extension(store): Extension<DynStore>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, ViewError> {
    let me = visitor.require_user()?;
    let Path(id) = path?;
    let user = find_user(store.as_ref(), id).await?;
    let profile = load_profile(store.as_ref(), &user, Some(me)).await?;
    let following = user.following(store.as_ref()).await?;

    Ok(html::render(
        &visitor,
        StatusCode::OK,
        "Following",
        &html::user_relations(&profile, "Following", &following),
    ))
}

#[utoipa::path(
    get,
    path = "/users/{id}/followers",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Users following this user", content_type = "text/html", body = String),
        (status = 303, description = "Not logged in, redirect to / with \"Access unauthorized.\""),
        (status = 404, description = "No such user")
    ),
    tag = "users"
)]
pub async fn followers(
    visitor: Visitor,
    Extension(store): Extension<DynStore>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, ViewError> {
    let me = visitor.require_user()?;
    let Path(id) = path?;
    let user = find_user(store.as_ref(), id).await?;
    let profile = load_profile(store.as_ref(), &user, Some(me)).await?;
    let followers = user.followers(store.as_ref()).await?;

    Ok(html::render(
        &visitor,
        StatusCode::OK,
        "Followers",
        &html::user_relations(&profile, "Followers", &followers),
    ))
}

#[utoipa::path(
    post,
    path = "/users/follow/{id}",
    params(("id" = i64, Path, description = "User to follow")),
    responses(
        (status = 303, description = "Redirect to the current user's following page"),
        (status = 404, description = "No such user")
    ),
    tag = "users"
)]
pub async fn follow(
    visitor: Visitor,
    Extension(store): Extension<DynStore>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, ViewError> {
    let me = visitor.require_user()?;
    let Path(id) = path?;
    let other = find_user(store.as_ref(), id).await?;
    let location = format!("/users/{}/following", me.id);

    match me.follow(store.as_ref(), &other).await {
        Ok(()) => Ok(redirect(&location, None)),
        Err(FollowError::SelfFollow) => Ok(redirect(
            &location,
            Some(Flash::danger(FollowError::SelfFollow.to_string())),
        )),
        Err(FollowError::Store(err)) => Err(err.into()),
    }
}

#[utoipa::path(
    post,
    path = "/users/stop-following/{id}",
    params(("id" = i64, Path, description = "User to stop following")),
    responses(
        (status = 303, description = "Redirect to the current user's following page"),
        (status = 404, description = "No such user")
    ),
    tag = "users"
)]
pub async fn stop_following(
    visitor: Visitor,
    Extension(store): Extension<DynStore>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, ViewError> {
    let me = visitor.require_user()?;
    let Path(id) = path?;
    let other = find_user(store.as_ref(), id).await?;
    me.unfollow(store.as_ref(), &other).await?;

    Ok(redirect(&format!("/users/{}/following", me.id), None))
}

#[utoipa::path(
    post,
    path = "/users/delete",
    responses((status = 303, description = "Account deleted, redirect to /signup")),
    tag = "users"
)]
pub async fn delete(
    visitor: Visitor,
    Extension(store): Extension<DynStore>,
    Extension(auth): Extension<Arc<AuthState>>,
) -> Result<Response, ViewError> {
    let me = visitor.require_user()?;
    me.delete(store.as_ref()).await?;

    info!(user_id = me.id, "Account deleted");

    let cookie = clear_session_cookie(auth.config()).map_err(anyhow::Error::from)?;
    Ok(redirect_with_cookies(
        "/signup",
        Some(Flash::success("Your account has been deleted.")),
        vec![cookie],
    ))
}
