//! Credential lifecycle endpoints.
//!
//! Handlers stay thin: decode the payload, call into [`AccountService`], and
//! translate the typed error into an HTTP response. All policy lives in the
//! service layer.

pub mod forgot_password;
pub mod login;
pub mod logout;
pub mod principal;
pub mod refresh;
pub mod register;
pub mod reset_password;
pub mod types;
pub mod verify_email;

use axum::http::{HeaderValue, StatusCode, header::InvalidHeaderValue};
use tracing::error;

use crate::account::AuthError;
use crate::token::{TokenKind, TokenService};

pub(crate) const ACCESS_COOKIE_NAME: &str = "access";
pub(crate) const REFRESH_COOKIE_NAME: &str = "refresh";

/// Map a lifecycle error to its wire response. Internal detail is logged,
/// never echoed back.
pub(crate) fn error_response(err: &AuthError) -> (StatusCode, String) {
    if let AuthError::Internal(source) = err {
        error!("internal error: {source:#}");
    }
    (err.status(), err.to_string())
}

/// Build an `HttpOnly` cookie carrying a token, scoped to the whole site.
pub(crate) fn token_cookie(
    name: &str,
    token: &str,
    max_age_seconds: i64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{name}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}"
    ))
}

pub(crate) fn access_cookie(
    tokens: &TokenService,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    token_cookie(
        ACCESS_COOKIE_NAME,
        token,
        tokens.lifetimes().seconds_for(TokenKind::Access),
    )
}

pub(crate) fn refresh_cookie(
    tokens: &TokenService,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    token_cookie(
        REFRESH_COOKIE_NAME,
        token,
        tokens.lifetimes().seconds_for(TokenKind::Refresh),
    )
}

/// Expire a token cookie immediately so the browser drops it.
pub(crate) fn clear_cookie(name: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
    ))
}
