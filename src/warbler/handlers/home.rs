use axum::{extract::Extension, http::StatusCode, response::Response};

use super::load_profile;
use crate::{
    models::Message,
    store::DynStore,
    warbler::{error::ViewError, html, visitor::Visitor},
};

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Landing page, or the timeline when logged in", content_type = "text/html", body = String)
    ),
    tag = "warbler"
)]
pub async fn home(
    visitor: Visitor,
    Extension(store): Extension<DynStore>,
) -> Result<Response, ViewError> {
    let Some(user) = visitor.user.as_ref() else {
        return Ok(html::render(
            &visitor,
            StatusCode::OK,
            "Warbler",
            &html::landing(),
        ));
    };

    let profile = load_profile(store.as_ref(), user, Some(user)).await?;
    let timeline = Message::timeline(store.as_ref(), user.id).await?;

    Ok(html::render(
        &visitor,
        StatusCode::OK,
        "Warbler",
        &html::home(&profile, &timeline),
    ))
}
