use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tracing::instrument;

use crate::account::AccountService;

use super::error_response;
use super::types::{ForgotPasswordRequest, MessageResponse};

#[utoipa::path(
    post,
    path = "/v1/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "If the account exists, a reset email was sent", body = MessageResponse),
        (status = 400, description = "Malformed email address"),
    ),
    tag = "auth"
)]
#[instrument(skip(service, payload))]
pub async fn forgot_password(
    service: Extension<Arc<AccountService>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> impl IntoResponse {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    // Same answer for known, unknown, and unverified emails.
    match service.request_password_reset(&payload.email).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "If that email is registered, a reset link has been sent".to_string(),
            }),
        )
            .into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}
