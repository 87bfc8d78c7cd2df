use axum::response::Json;
use utoipa::{
    openapi::{Contact, InfoBuilder, License},
    OpenApi,
};

use super::handlers::{auth, health, home, messages, users};

#[derive(OpenApi)]
#[openapi(
    paths(
        home::home,
        auth::signup_form,
        auth::signup,
        auth::login_form,
        auth::login,
        auth::logout,
        users::index,
        users::show,
        users::following,
        users::followers,
        users::follow,
        users::stop_following,
        users::delete,
        messages::new_form,
        messages::create,
        messages::show,
        messages::delete,
        health::health,
    ),
    components(schemas(
        health::Health,
        auth::SignupRequest,
        auth::LoginRequest,
        messages::NewMessageRequest
    )),
    tags(
        (name = "warbler", description = "Home timeline"),
        (name = "auth", description = "Signup, login and logout"),
        (name = "users", description = "Profiles and follow relationships"),
        (name = "messages", description = "Posting and deleting messages"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();

    // Use Cargo.toml metadata instead of the derive defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();
    info.contact = cargo_contact();
    info.license = cargo_license();
    doc.info = info;

    doc
}

/// Serves the document at `/api-docs/openapi.json`.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    Some(value.trim()).filter(|trimmed| !trimmed.is_empty())
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|trimmed| !trimmed.is_empty())
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, rest)) => (non_empty(name), non_empty(rest.trim_end_matches('>'))),
        None => (non_empty(author), None),
    }
}
