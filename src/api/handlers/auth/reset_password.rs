use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tracing::instrument;

use crate::account::AccountService;

use super::error_response;
use super::types::{MessageResponse, ResetPasswordRequest};

#[utoipa::path(
    post,
    path = "/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced; lockout state cleared", body = MessageResponse),
        (status = 400, description = "Invalid token or password"),
        (status = 403, description = "Account is not verified"),
        (status = 404, description = "Account no longer exists"),
    ),
    tag = "auth"
)]
#[instrument(skip(service, payload))]
pub async fn reset_password(
    service: Extension<Arc<AccountService>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    match service
        .complete_password_reset(&payload.token, &payload.password)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Password has been reset".to_string(),
            }),
        )
            .into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}
