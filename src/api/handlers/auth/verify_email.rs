use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tracing::instrument;

use crate::account::{AccountService, VerifyOutcome};

use super::error_response;
use super::types::{MessageResponse, ResendVerificationRequest, VerifyEmailRequest};

#[utoipa::path(
    post,
    path = "/v1/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified (or was already verified)", body = MessageResponse),
        (status = 400, description = "Invalid or expired token"),
        (status = 404, description = "Account no longer exists"),
    ),
    tag = "auth"
)]
#[instrument(skip(service, payload))]
pub async fn verify_email(
    service: Extension<Arc<AccountService>>,
    payload: Option<Json<VerifyEmailRequest>>,
) -> impl IntoResponse {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    match service.verify_email(&payload.token).await {
        Ok(outcome) => {
            let message = match outcome {
                VerifyOutcome::Verified => "Email verified",
                VerifyOutcome::AlreadyVerified => "Email already verified",
            };
            (
                StatusCode::OK,
                Json(MessageResponse {
                    message: message.to_string(),
                }),
            )
                .into_response()
        }
        Err(err) => error_response(&err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/resend-verification",
    request_body = ResendVerificationRequest,
    responses(
        (status = 204, description = "If the account exists and is unverified, a new email was sent"),
    ),
    tag = "auth"
)]
#[instrument(skip(service, payload))]
pub async fn resend_verification(
    service: Extension<Arc<AccountService>>,
    payload: Option<Json<ResendVerificationRequest>>,
) -> impl IntoResponse {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    // The response never reveals whether the email is registered.
    match service.resend_verification(&payload.email).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}
