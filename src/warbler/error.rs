use axum::{
    extract::rejection::{FormRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use super::{
    flash::{redirect, Flash},
    html,
};
use crate::{credentials::CredentialError, store::StoreError};

pub const UNAUTHORIZED_MESSAGE: &str = "Access unauthorized.";

/// Failure of a view handler.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("access unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    /// The request path or body could not be extracted.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => redirect("/", Some(Flash::danger(UNAUTHORIZED_MESSAGE))),
            Self::NotFound => html::error_page(
                StatusCode::NOT_FOUND,
                "Page not found",
                "The page you are looking for does not exist.",
            ),
            Self::Rejected { status, message } => html::error_page(
                status,
                status.canonical_reason().unwrap_or("Bad request"),
                &message,
            ),
            Self::Store(err) => {
                error!("Store error: {err}");
                internal_error()
            }
            Self::Credential(err) => {
                error!("Credential error: {err}");
                internal_error()
            }
            Self::Internal(err) => {
                error!("Internal error: {err:#}");
                internal_error()
            }
        }
    }
}

impl From<FormRejection> for ViewError {
    fn from(rejection: FormRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ViewError {
    fn from(rejection: PathRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

fn internal_error() -> Response {
    html::error_page(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Something went wrong",
        "Please try again later.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;

    #[test]
    fn unauthorized_redirects_home() {
        let response = ViewError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/");
    }

    #[test]
    fn not_found_is_404() {
        assert_eq!(
            ViewError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn rejection_keeps_status() {
        let err = ViewError::Rejected {
            status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
            message: "Expected request with `Content-Type: application/x-www-form-urlencoded`"
                .to_string(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn store_error_is_500() {
        let err = ViewError::from(StoreError::CheckViolation("x".to_string()));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
