//! Authenticated self-service endpoint.

use axum::{
    Json,
    extract::Extension,
    http::HeaderMap,
    response::IntoResponse,
};
use std::sync::Arc;

use crate::account::{AccountService, AccountSummary};
use crate::token::TokenService;

use super::auth::{error_response, principal::require_auth};

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "Return the authenticated account", body = AccountSummary),
        (status = 401, description = "Missing or invalid access token"),
        (status = 404, description = "Account no longer exists"),
    ),
    tag = "me"
)]
pub async fn get_me(
    headers: HeaderMap,
    service: Extension<Arc<AccountService>>,
    tokens: Extension<Arc<TokenService>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &tokens) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    match service.account_summary(principal.account_id).await {
        Ok(summary) => Json::<AccountSummary>(summary).into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}
