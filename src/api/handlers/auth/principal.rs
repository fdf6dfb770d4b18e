//! Authenticated principal extraction.
//!
//! Reads the access token from the `Authorization: Bearer` header or the
//! `access` cookie and validates it statelessly. No database lookup happens
//! here; handlers that need the account resolve it themselves.

use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION, header::COOKIE};
use uuid::Uuid;

use crate::token::{TokenKind, TokenService};

use super::ACCESS_COOKIE_NAME;

/// Authenticated caller context derived from a valid access token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub account_id: Uuid,
    pub email: String,
}

/// Resolve the request's access token into a principal, or 401.
///
/// # Errors
/// `StatusCode::UNAUTHORIZED` when the token is missing, expired, or of the
/// wrong kind.
pub fn require_auth(headers: &HeaderMap, tokens: &TokenService) -> Result<Principal, StatusCode> {
    let token = extract_access_token(headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let claims = tokens
        .validate(TokenKind::Access, &token)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    Ok(Principal {
        account_id: claims.sub,
        email: claims.email,
    })
}

fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == ACCESS_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
