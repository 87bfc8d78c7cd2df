use axum::{
    extract::{
        rejection::{FormRejection, PathRejection},
        Extension, Path,
    },
    http::StatusCode,
    response::Response,
    Form,
};
use serde::Deserialize;
use tracing::debug;
use utoipa::ToSchema;

use crate::{
    models::{Message, MessageError, User},
    store::DynStore,
    warbler::{error::ViewError, flash::redirect, html, visitor::Visitor},
};

#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct NewMessageRequest {
    #[serde(default)]
    text: String,
}

#[utoipa::path(
    get,
    path = "/messages/new",
    responses(
        (status = 200, description = "New message form", content_type = "text/html", body = String),
        (status = 303, description = "Not logged in, redirect to / with \"Access unauthorized.\"")
    ),
    tag = "messages"
)]
pub async fn new_form(visitor: Visitor) -> Result<Response, ViewError> {
    visitor.require_user()?;
    Ok(html::render(
        &visitor,
        StatusCode::OK,
        "New message",
        &html::message_form(None, ""),
    ))
}

#[utoipa::path(
    post,
    path = "/messages/new",
    request_body(content = NewMessageRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Message posted, redirect to the author's profile"),
        (status = 200, description = "Form re-rendered with an error", content_type = "text/html", body = String)
    ),
    tag = "messages"
)]
pub async fn create(
    visitor: Visitor,
    Extension(store): Extension<DynStore>,
    form: Result<Form<NewMessageRequest>, FormRejection>,
) -> Result<Response, ViewError> {
    let me = visitor.require_user()?;
    let Form(request) = form?;

    match Message::create(store.as_ref(), me.id, &request.text).await {
        Ok(message) => {
            debug!(message_id = message.id, user_id = me.id, "Message posted");
            Ok(redirect(&format!("/users/{}", me.id), None))
        }
        Err(err @ MessageError::InvalidText) => {
            let error = err.to_string();
            Ok(html::render(
                &visitor,
                StatusCode::OK,
                "New message",
                &html::message_form(Some(&error), &request.text),
            ))
        }
        Err(MessageError::Store(err)) => Err(err.into()),
    }
}

#[utoipa::path(
    get,
    path = "/messages/{id}",
    params(("id" = i64, Path, description = "Message id")),
    responses(
        (status = 200, description = "Single message", content_type = "text/html", body = String),
        (status = 404, description = "No such message")
    ),
    tag = "messages"
)]
pub async fn show(
    visitor: Visitor,
    Extension(store): Extension<DynStore>,
    Path(id): Path<i64>,
) -> Result<Response, ViewError> {
    let message = Message::find(store.as_ref(), id)
        .await?
        .ok_or(ViewError::NotFound)?;
    let author = User::find(store.as_ref(), message.user_id)
        .await?
        .ok_or(ViewError::NotFound)?;

    Ok(html::render(
        &visitor,
        StatusCode::OK,
        "Message",
        &html::message_show(&message, &author, visitor.user.as_ref()),
    ))
}

#[utoipa::path(
    post,
    path = "/messages/{id}/delete",
    params(("id" = i64, Path, description = "Message id")),
    responses(
        (status = 303, description = "Message deleted, redirect to the owner's profile; anyone else is redirected to / with \"Access unauthorized.\""),
        (status = 404, description = "No such message")
    ),
    tag = "messages"
)]
pub async fn delete(
    visitor: Visitor,
    Extension(store): Extension<DynStore>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, ViewError> {
    let me = visitor.require_user()?;
    let Path(id) = path?;
    let message = Message::find(store.as_ref(), id)
        .await?
        .ok_or(ViewError::NotFound)?;

    if !message.is_owned_by(me.id) {
        return Err(ViewError::Unauthorized);
    }

    message.delete(store.as_ref()).await?;
    debug!(message_id = message.id, user_id = me.id, "Message deleted");

    Ok(redirect(&format!("/users/{}", me.id), None))
}
