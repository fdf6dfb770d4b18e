use axum::{
    Json,
    extract::Extension,
    http::{StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{error, instrument};

use crate::account::{AccountService, AuthError};
use crate::token::TokenService;

use super::types::{RefreshRequest, TokenPairResponse};
use super::{access_cookie, error_response, refresh_cookie};

/// An unusable refresh token means the session is gone, so the caller must
/// log in again; that is 401, not a malformed request.
fn refresh_error_response(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, err.to_string()),
        _ => error_response(err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair issued", body = TokenPairResponse),
        (status = 401, description = "Invalid or expired refresh token"),
        (status = 403, description = "Account is not verified"),
        (status = 404, description = "Account no longer exists"),
    ),
    tag = "auth"
)]
#[instrument(skip(service, tokens, payload))]
pub async fn refresh(
    service: Extension<Arc<AccountService>>,
    tokens: Extension<Arc<TokenService>>,
    payload: Option<Json<RefreshRequest>>,
) -> Response {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let pair = match service.refresh_tokens(&payload.refresh_token).await {
        Ok(pair) => pair,
        Err(err) => return refresh_error_response(&err).into_response(),
    };

    let body = TokenPairResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };

    let mut response = (StatusCode::OK, Json(&body)).into_response();
    match (
        access_cookie(&tokens, &body.access_token),
        refresh_cookie(&tokens, &body.refresh_token),
    ) {
        (Ok(access), Ok(refresh)) => {
            response.headers_mut().append(SET_COOKIE, access);
            response.headers_mut().append(SET_COOKIE, refresh);
        }
        _ => error!("failed to build session cookies"),
    }
    response
}
