//! One-shot notices carried across a redirect in the `warbler_flash` cookie.

use axum::http::{
    header::{InvalidHeaderValue, LOCATION, SET_COOKIE},
    HeaderMap, HeaderValue, StatusCode,
};
use axum::response::{IntoResponse, Response};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::session::cookie_value;

pub const FLASH_COOKIE_NAME: &str = "warbler_flash";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub category: String,
    pub message: String,
}

impl Flash {
    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            category: "danger".to_string(),
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            category: "success".to_string(),
            message: message.into(),
        }
    }

    /// `Set-Cookie` value holding this flash as base64url JSON.
    pub(crate) fn to_cookie(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let json = serde_json::to_vec(self).unwrap_or_default();
        let encoded = URL_SAFE_NO_PAD.encode(json);
        HeaderValue::from_str(&format!(
            "{FLASH_COOKIE_NAME}={encoded}; Path=/; HttpOnly; SameSite=Lax"
        ))
    }

    /// Flash pending in the request cookies; malformed values are ignored.
    pub(crate) fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = cookie_value(headers, FLASH_COOKIE_NAME)?;
        let bytes = URL_SAFE_NO_PAD.decode(value.as_bytes()).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

pub(crate) fn clear_flash_cookie() -> HeaderValue {
    HeaderValue::from_static("warbler_flash=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// `303 See Other` to `location`, optionally queueing a flash.
pub fn redirect(location: &str, flash: Option<Flash>) -> Response {
    redirect_with_cookies(location, flash, Vec::new())
}

/// Like [`redirect`], also setting extra cookies such as the session.
pub(crate) fn redirect_with_cookies(
    location: &str,
    flash: Option<Flash>,
    cookies: Vec<HeaderValue>,
) -> Response {
    let mut headers = HeaderMap::new();

    match HeaderValue::from_str(location) {
        Ok(value) => {
            headers.insert(LOCATION, value);
        }
        Err(err) => {
            error!("Invalid redirect location {location}: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    for cookie in cookies {
        headers.append(SET_COOKIE, cookie);
    }

    if let Some(flash) = flash {
        match flash.to_cookie() {
            Ok(cookie) => {
                headers.append(SET_COOKIE, cookie);
            }
            Err(err) => error!("Failed to build flash cookie: {err}"),
        }
    }

    (StatusCode::SEE_OTHER, headers).into_response()
}
