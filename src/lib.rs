//! # Custos (Credential & Token Lifecycle Service)
//!
//! `custos` manages the full lifecycle of user credentials: registration with
//! email verification, login with failed-attempt lockout, stateless
//! access/refresh token rotation, and password recovery.
//!
//! ## Token Model
//!
//! Four token kinds (`access`, `refresh`, `email-verification`,
//! `password-reset`), each signed with its own secret and lifetime. The kind
//! tag is part of the signed payload, so tokens minted for one purpose cannot
//! be replayed for another. No token state is persisted; validity is
//! signature + kind + expiry.
//!
//! ## Lockout
//!
//! Five consecutive failed logins open a fifteen-minute lock window. The lock
//! gate runs before the password comparison, and a correct login or a
//! completed password reset clears the counter and the window.
//!
//! ## Enumeration Resistance
//!
//! Unknown email and wrong password return the same error. Password reset and
//! verification resend requests answer identically whether or not the account
//! exists, and unverified accounts are declined silently.

pub mod account;
pub mod api;
pub mod cli;
pub mod email;
pub mod token;

pub use api::APP_USER_AGENT;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
