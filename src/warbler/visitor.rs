//! Per-request identity: the logged-in user (if any) and the pending flash.

use anyhow::anyhow;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::{error::ViewError, flash::Flash, session};
use crate::{models::User, store::DynStore};

#[derive(Clone, Debug, Default)]
pub struct Visitor {
    pub user: Option<User>,
    pub flash: Option<Flash>,
}

impl Visitor {
    /// The current user, or [`ViewError::Unauthorized`] for anonymous visitors.
    ///
    /// # Errors
    /// Returns [`ViewError::Unauthorized`] when nobody is logged in.
    pub fn require_user(&self) -> Result<&User, ViewError> {
        self.user.as_ref().ok_or(ViewError::Unauthorized)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Visitor
where
    S: Send + Sync,
{
    type Rejection = ViewError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let store = parts
            .extensions
            .get::<DynStore>()
            .cloned()
            .ok_or_else(|| anyhow!("store extension missing"))?;

        let user = session::current_user(&parts.headers, store.as_ref()).await?;
        let flash = Flash::from_headers(&parts.headers);

        Ok(Self { user, flash })
    }
}
