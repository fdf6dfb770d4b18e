//! Typed failures for the account lifecycle.
//!
//! Business-rule failures never cross the state-machine boundary as panics or
//! bare strings; handlers map each variant to a status code in one place.
//! Messages that could confirm whether an account exists stay deliberately
//! generic.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("An account with this email already exists")]
    Conflict,

    /// Unknown email and wrong password share this variant so the response is
    /// indistinguishable either way.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account locked. Try again in {minutes} minute(s)")]
    AccountLocked { minutes: i64 },

    #[error("Email address is not verified")]
    VerificationRequired,

    /// Bad signature, wrong kind tag, and expiry are collapsed into one
    /// externally visible failure.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Account not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Conflict => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::AccountLocked { .. } => StatusCode::LOCKED,
            Self::VerificationRequired => StatusCode::FORBIDDEN,
            Self::InvalidToken | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
