//! HTTP layer: router, tower layers and the server loop.

use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;

use crate::{store::DynStore, APP_USER_AGENT};

pub mod error;
pub mod flash;
pub mod handlers;
pub mod html;
pub mod openapi;
pub mod session;
pub mod state;
pub mod visitor;

pub use self::error::ViewError;
pub use self::state::{AuthConfig, AuthState, MAX_SESSION_TTL_SECONDS};
pub use self::visitor::Visitor;

/// Build the application router over `store`.
#[must_use]
pub fn router(store: DynStore, auth: Arc<AuthState>) -> Router {
    use handlers::{auth as auth_views, health, home, messages, users};

    Router::new()
        .route("/", get(home::home))
        .route(
            "/signup",
            get(auth_views::signup_form).post(auth_views::signup),
        )
        .route("/login", get(auth_views::login_form).post(auth_views::login))
        .route("/logout", get(auth_views::logout))
        .route("/users", get(users::index))
        .route("/users/delete", post(users::delete))
        .route("/users/follow/:id", post(users::follow))
        .route("/users/stop-following/:id", post(users::stop_following))
        .route("/users/:id", get(users::show))
        .route("/users/:id/following", get(users::following))
        .route("/users/:id/followers", get(users::followers))
        .route(
            "/messages/new",
            get(messages::new_form).post(messages::create),
        )
        .route("/messages/:id", get(messages::show))
        .route("/messages/:id/delete", post(messages::delete))
        .route("/health", get(health::health))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(auth))
                .layer(Extension(store)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, store: DynStore, auth: Arc<AuthState>) -> Result<()> {
    let app = router(store, auth);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("{} listening on [::]:{}", APP_USER_AGENT, port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
