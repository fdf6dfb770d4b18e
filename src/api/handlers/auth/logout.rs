use axum::{
    Json,
    http::{StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use tracing::{error, instrument};

use super::types::MessageResponse;
use super::{ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, clear_cookie};

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 200, description = "Session cookies cleared", body = MessageResponse),
    ),
    tag = "auth"
)]
#[instrument]
pub async fn logout() -> Response {
    let mut response = (
        StatusCode::OK,
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    )
        .into_response();

    // The cookies are HttpOnly, so expiring them server-side is the only way
    // a browser client can drop them. Tokens themselves stay valid until
    // expiry; there is no revocation store.
    match (
        clear_cookie(ACCESS_COOKIE_NAME),
        clear_cookie(REFRESH_COOKIE_NAME),
    ) {
        (Ok(access), Ok(refresh)) => {
            response.headers_mut().append(SET_COOKIE, access);
            response.headers_mut().append(SET_COOKIE, refresh);
        }
        _ => error!("failed to build expired session cookies"),
    }
    response
}
