use axum::{
    Json,
    extract::Extension,
    http::{StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{error, instrument};

use crate::account::AccountService;
use crate::token::TokenService;

use super::types::{LoginRequest, LoginResponse};
use super::{access_cookie, error_response, refresh_cookie};

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful; tokens returned and set as cookies", body = LoginResponse),
        (status = 401, description = "Invalid email or password"),
        (status = 403, description = "Email not verified"),
        (status = 423, description = "Account temporarily locked"),
    ),
    tag = "auth"
)]
#[instrument(skip(service, tokens, payload))]
pub async fn login(
    service: Extension<Arc<AccountService>>,
    tokens: Extension<Arc<TokenService>>,
    payload: Option<Json<LoginRequest>>,
) -> Response {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let success = match service.login(&payload.email, &payload.password).await {
        Ok(success) => success,
        Err(err) => return error_response(&err).into_response(),
    };

    let body = LoginResponse {
        account: success.account,
        access_token: success.tokens.access_token,
        refresh_token: success.tokens.refresh_token,
    };

    let mut response = (StatusCode::OK, Json(&body)).into_response();
    // Cookies mirror the body so browser and API clients both work.
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
