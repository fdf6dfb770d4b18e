use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tracing::instrument;

use crate::account::AccountService;

use super::error_response;
use super::types::{RegisterRequest, RegisterResponse};

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created; verification email queued", body = RegisterResponse),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "An account with this email already exists"),
    ),
    tag = "auth"
)]
#[instrument(skip(service, payload))]
pub async fn register(
    service: Extension<Arc<AccountService>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    match service.register(&payload.email, &payload.password).await {
        Ok(account) => (
            StatusCode::CREATED,
            Json(RegisterResponse {
                account,
                message: "Registration successful. Check your email to verify your account."
                    .to_string(),
            }),
        )
            .into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}
