//! Delivery gateway for verification and reset links.
//!
//! The lifecycle hands tokens off here and moves on: delivery failures are
//! logged by the caller, never retried, and never roll back the account
//! mutation that triggered them.

use anyhow::Result;
use tracing::info;

/// Outbound mail contract. Implementations are best-effort collaborators.
pub trait EmailSender: Send + Sync {
    /// # Errors
    /// Returns an error if the message could not be handed off.
    fn send_verification_email(&self, to_email: &str, verify_url: &str) -> Result<()>;

    /// # Errors
    /// Returns an error if the message could not be handed off.
    fn send_password_reset_email(&self, to_email: &str, reset_url: &str) -> Result<()>;
}

/// Logs outbound links instead of delivering them. Stands in for a real
/// transport in development and tests.
#[derive(Clone, Debug, Default)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send_verification_email(&self, to_email: &str, verify_url: &str) -> Result<()> {
        info!(to_email = %to_email, url = %verify_url, "verification email send stub");
        Ok(())
    }

    fn send_password_reset_email(&self, to_email: &str, reset_url: &str) -> Result<()> {
        info!(to_email = %to_email, url = %reset_url, "password reset email send stub");
        Ok(())
    }
}

/// Builds the frontend links embedded in outbound emails.
#[derive(Clone, Debug)]
pub struct EmailLinks {
    frontend_base_url: String,
}

impl EmailLinks {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self { frontend_base_url }
    }

    #[must_use]
    pub fn verify_url(&self, token: &str) -> String {
        let base = self.frontend_base_url.trim_end_matches('/');
        format!("{base}/verify?token={token}")
    }

    #[must_use]
    pub fn reset_url(&self, token: &str) -> String {
        let base = self.frontend_base_url.trim_end_matches('/');
        format!("{base}/reset-password-token?token={token}")
    }
}
