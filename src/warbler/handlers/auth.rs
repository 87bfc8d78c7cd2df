//! Signup, login and logout.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::Response,
    Form,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::{
    models::{SignupError, SignupForm, User},
    store::DynStore,
    warbler::{
        error::ViewError,
        flash::{redirect_with_cookies, Flash},
        html,
        session::{self, clear_session_cookie, session_cookie},
        state::AuthState,
        visitor::Visitor,
    },
};

/// Shortest password accepted by the signup form.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct SignupRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[utoipa::path(
    get,
    path = "/signup",
    responses((status = 200, description = "Signup form", content_type = "text/html", body = String)),
    tag = "auth"
)]
pub async fn signup_form(visitor: Visitor) -> Response {
    html::render(
        &visitor,
        StatusCode::OK,
        "Sign up",
        &html::signup_form(None, &html::SignupValues::default()),
    )
}

#[utoipa::path(
    post,
    path = "/signup",
    request_body(content = SignupRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Account created and logged in, redirect to /"),
        (status = 200, description = "Form re-rendered with a validation error", content_type = "text/html", body = String)
    ),
    tag = "auth"
)]
pub async fn signup(
    visitor: Visitor,
    Extension(store): Extension<DynStore>,
    Extension(auth): Extension<Arc<AuthState>>,
    Form(request): Form<SignupRequest>,
) -> Result<Response, ViewError> {
    let values = html::SignupValues {
        username: &request.username,
        email: &request.email,
        image_url: request.image_url.as_deref().unwrap_or_default(),
    };
    let rerender = |error: &str| {
        html::render(
            &visitor,
            StatusCode::OK,
            "Sign up",
            &html::signup_form(Some(error), &values),
        )
    };

    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Ok(rerender("Password must be at least 6 characters."));
    }

    let form = SignupForm {
        username: request.username.clone(),
        email: request.email.clone(),
        password: request.password.clone(),
        image_url: request.image_url.clone(),
    };

    let user = match User::signup(store.as_ref(), auth.credentials(), form).await {
        Ok(user) => user,
        Err(SignupError::Validation(err)) => {
            debug!("Signup rejected: {err}");
            return Ok(rerender(&err.to_string()));
        }
        Err(SignupError::Credential(err)) => return Err(err.into()),
        Err(SignupError::Store(err)) => return Err(err.into()),
    };

    info!(user_id = user.id, "New account");

    let token = session::create_session(store.as_ref(), auth.config(), user.id).await?;
    let cookie = session_cookie(auth.config(), &token).map_err(anyhow::Error::from)?;

    Ok(redirect_with_cookies("/", None, vec![cookie]))
}

#[utoipa::path(
    get,
    path = "/login",
    responses((status = 200, description = "Login form", content_type = "text/html", body = String)),
    tag = "auth"
)]
pub async fn login_form(visitor: Visitor) -> Response {
    html::render(&visitor, StatusCode::OK, "Log in", &html::login_form(None, ""))
}

#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Logged in, redirect to /"),
        (status = 200, description = "Form re-rendered with \"Invalid credentials.\"", content_type = "text/html", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    visitor: Visitor,
    Extension(store): Extension<DynStore>,
    Extension(auth): Extension<Arc<AuthState>>,
    Form(request): Form<LoginRequest>,
) -> Result<Response, ViewError> {
    let Some(user) = User::authenticate(
        store.as_ref(),
        auth.credentials(),
        &request.username,
        &request.password,
    )
    .await?
    else {
        debug!("Invalid credentials");
        return Ok(html::render(
            &visitor,
            StatusCode::OK,
            "Log in",
            &html::login_form(Some("Invalid credentials."), &request.username),
        ));
    };

    let token = session::create_session(store.as_ref(), auth.config(), user.id).await?;
    let cookie = session_cookie(auth.config(), &token).map_err(anyhow::Error::from)?;

    Ok(redirect_with_cookies(
        "/",
        Some(Flash::success(format!("Hello, {}!", user.username))),
        vec![cookie],
    ))
}

#[utoipa::path(
    get,
    path = "/logout",
    responses((status = 303, description = "Session cleared, redirect to /login")),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    Extension(store): Extension<DynStore>,
    Extension(auth): Extension<Arc<AuthState>>,
) -> Result<Response, ViewError> {
    session::destroy_session(&headers, store.as_ref()).await;
    let cookie = clear_session_cookie(auth.config()).map_err(anyhow::Error::from)?;

    Ok(redirect_with_cookies(
        "/login",
        Some(Flash::success("You have successfully logged out.")),
        vec![cookie],
    ))
}
