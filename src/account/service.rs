//! Account lifecycle state machine.
//!
//! Registration, verification, login admission, lockout, and password reset
//! are decided here; handlers only translate the typed results to HTTP. The
//! ordering of checks inside `login` is deliberate: the lock gate runs before
//! the password comparison, and the verification gate only after the password
//! is known to be correct.

use anyhow::anyhow;
use chrono::Utc;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::email::{EmailLinks, EmailSender};
use crate::token::{TokenError, TokenKind, TokenService};

use super::error::AuthError;
use super::models::{Account, AccountSummary};
use super::password::{hash_password, verify_password};
use super::store::{CreateOutcome, CredentialStore};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Access/refresh pair issued on login and refresh.
#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug)]
pub struct LoginSuccess {
    pub account: AccountSummary,
    pub tokens: TokenPair,
}

/// Distinguishes a fresh verification from an idempotent replay.
#[derive(Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    AlreadyVerified,
}

/// Normalize an email for lookup and uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is a valid regex")
});

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    EMAIL_REGEX.is_match(email_normalized)
}

fn require_valid_email(email_normalized: &str) -> Result<(), AuthError> {
    if valid_email(email_normalized) {
        Ok(())
    } else {
        Err(AuthError::Validation("Invalid email address".to_string()))
    }
}

fn require_valid_password(password: &str) -> Result<(), AuthError> {
    if password.len() >= MIN_PASSWORD_LENGTH {
        Ok(())
    } else {
        Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )))
    }
}

pub struct AccountService {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenService>,
    mailer: Arc<dyn EmailSender>,
    links: EmailLinks,
}

impl AccountService {
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenService>,
        mailer: Arc<dyn EmailSender>,
        links: EmailLinks,
    ) -> Self {
        Self {
            store,
            tokens,
            mailer,
            links,
        }
    }

    /// Create an unverified account and hand a verification link to the
    /// delivery gateway. Delivery failure is logged, not returned: the caller
    /// still gets a created account and can request a new link later.
    ///
    /// # Errors
    /// `Validation` on malformed input, `Conflict` on duplicate email,
    /// `Internal` on store faults.
    pub async fn register(&self, email: &str, password: &str) -> Result<AccountSummary, AuthError> {
        let email = normalize_email(email);
        require_valid_email(&email)?;
        require_valid_password(password)?;

        let password_hash = hash_password(password)?;

        let account = match self.store.create(&email, &password_hash).await? {
            CreateOutcome::Created(account) => account,
            CreateOutcome::Conflict => return Err(AuthError::Conflict),
        };

        if let Err(err) = self.send_verification(&account) {
            warn!(email = %account.email, "failed to send verification email: {err:#}");
        }

        Ok(account.summary())
    }

    /// Consume an email-verification token. Idempotent for already-verified
    /// accounts; the transition itself is one-way.
    ///
    /// # Errors
    /// `InvalidToken` on a bad/expired/mis-kinded token, `NotFound` if the
    /// subject account no longer exists.
    pub async fn verify_email(&self, token: &str) -> Result<VerifyOutcome, AuthError> {
        let claims = self.validate_token(TokenKind::EmailVerification, token)?;

        let account = self
            .store
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::NotFound)?;

        if account.is_verified {
            debug!(email = %account.email, "account already verified");
            return Ok(VerifyOutcome::AlreadyVerified);
        }

        self.store.set_verified(account.id).await?;
        info!(email = %account.email, "email verified");
        Ok(VerifyOutcome::Verified)
    }

    /// Admit or refuse a login.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    /// The lock gate runs before the password comparison; the verification
    /// gate runs only after the password matched, so an unverified-account
    /// probe still needs the correct password.
    ///
    /// # Errors
    /// `InvalidCredentials`, `AccountLocked`, `VerificationRequired`, or
    /// `Internal` on store faults.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSuccess, AuthError> {
        let email = normalize_email(email);

        let Some(account) = self.store.find_by_email(&email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        let now = Utc::now();
        if let Some(minutes) = account.lock_remaining_minutes(now) {
            return Err(AuthError::AccountLocked { minutes });
        }

        if !verify_password(password, &account.password_hash)? {
            self.store.increment_failed_attempts(account.id).await?;
            return Err(AuthError::InvalidCredentials);
        }

        if !account.is_verified {
            return Err(AuthError::VerificationRequired);
        }

        self.store.reset_failed_attempts(account.id).await?;

        let tokens = self.issue_pair(&account)?;
        info!(email = %account.email, "login successful");
        Ok(LoginSuccess {
            account: account.summary(),
            tokens,
        })
    }

    /// Rotate an access/refresh pair from a valid refresh token. The old
    /// refresh token keeps working until it expires; there is no revocation
    /// store.
    ///
    /// # Errors
    /// `InvalidToken`, `NotFound` if the subject vanished, or
    /// `VerificationRequired` if the account is no longer eligible.
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.validate_token(TokenKind::Refresh, refresh_token)?;

        let account = self
            .store
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !account.is_verified {
            return Err(AuthError::VerificationRequired);
        }

        self.issue_pair(&account)
    }

    /// Start a password reset. The result is identical whether or not the
    /// account exists; only verified accounts actually get an email, and an
    /// unverified account is declined silently.
    ///
    /// # Errors
    /// `Validation` on a malformed email, `Internal` on store faults.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        require_valid_email(&email)?;

        let Some(account) = self.store.find_by_email(&email).await? else {
            debug!("password reset requested for unknown email");
            return Ok(());
        };

        if !account.is_verified {
            info!(email = %account.email, "password reset declined for unverified account");
            return Ok(());
        }

        match self
            .tokens
            .issue(TokenKind::PasswordReset, account.id, &account.email)
        {
            Ok(token) => {
                let url = self.links.reset_url(&token);
                if let Err(err) = self.mailer.send_password_reset_email(&account.email, &url) {
                    warn!(email = %account.email, "failed to send password reset email: {err:#}");
                }
            }
            Err(err) => {
                warn!(email = %account.email, "failed to issue password reset token: {err}");
            }
        }

        Ok(())
    }

    /// Finish a password reset: replace the hash and clear the failed-attempt
    /// counter and any lock. The token is not consumed server-side; expiry is
    /// its only deactivation.
    ///
    /// # Errors
    /// `InvalidToken`, `NotFound`, `VerificationRequired`, or `Validation` on
    /// a too-short replacement password.
    pub async fn complete_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let claims = self.validate_token(TokenKind::PasswordReset, token)?;
        require_valid_password(new_password)?;

        let account = self
            .store
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !account.is_verified {
            return Err(AuthError::VerificationRequired);
        }

        let password_hash = hash_password(new_password)?;
        self.store
            .set_password_hash(account.id, &password_hash)
            .await?;
        info!(email = %account.email, "password reset completed");
        Ok(())
    }

    /// Send a fresh verification link. Opaque to the caller: unknown and
    /// already-verified emails behave exactly like the successful case.
    ///
    /// # Errors
    /// `Internal` on store faults.
    pub async fn resend_verification(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        if !valid_email(&email) {
            return Ok(());
        }

        let Some(account) = self.store.find_by_email(&email).await? else {
            return Ok(());
        };
        if account.is_verified {
            debug!(email = %account.email, "resend skipped for verified account");
            return Ok(());
        }

        if let Err(err) = self.send_verification(&account) {
            warn!(email = %account.email, "failed to resend verification email: {err:#}");
        }
        Ok(())
    }

    /// Public summary for a known account id (used by protected endpoints).
    ///
    /// # Errors
    /// `NotFound` if the account vanished after token issuance.
    pub async fn account_summary(&self, id: Uuid) -> Result<AccountSummary, AuthError> {
        let account = self.store.find_by_id(id).await?.ok_or(AuthError::NotFound)?;
        Ok(account.summary())
    }

    fn validate_token(
        &self,
        kind: TokenKind,
        token: &str,
    ) -> Result<crate::token::Claims, AuthError> {
        self.tokens.validate(kind, token).map_err(|err| match err {
            TokenError::Invalid => AuthError::InvalidToken,
            TokenError::Signing(err) => AuthError::Internal(anyhow!(err)),
        })
    }

    fn issue_pair(&self, account: &Account) -> Result<TokenPair, AuthError> {
        let access_token = self
            .tokens
            .issue(TokenKind::Access, account.id, &account.email)
            .map_err(|err| AuthError::Internal(anyhow!(err)))?;
        let refresh_token = self
            .tokens
            .issue(TokenKind::Refresh, account.id, &account.email)
            .map_err(|err| AuthError::Internal(anyhow!(err)))?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    fn send_verification(&self, account: &Account) -> anyhow::Result<()> {
        let token = self
            .tokens
            .issue(TokenKind::EmailVerification, account.id, &account.email)
            .map_err(|err| anyhow!(err))?;
        let url = self.links.verify_url(&token);
        self.mailer.send_verification_email(&account.email, &url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::models::MAX_FAILED_LOGIN_ATTEMPTS;
    use crate::account::store::MemoryCredentialStore;
    use crate::email::LogEmailSender;
    use crate::token::{TokenLifetimes, TokenSecrets};
    use anyhow::{Result, bail};
    use secrecy::SecretString;

    fn token_service() -> Arc<TokenService> {
        Arc::new(TokenService::new(
            &TokenSecrets {
                access: SecretString::from("access-secret"),
                refresh: SecretString::from("refresh-secret"),
                email_verification: SecretString::from("email-secret"),
                password_reset: SecretString::from("reset-secret"),
            },
            TokenLifetimes::new(),
        ))
    }

    fn service() -> AccountService {
        AccountService::new(
            Arc::new(MemoryCredentialStore::new()),
            token_service(),
            Arc::new(LogEmailSender),
            EmailLinks::new("https://app.custos.dev".to_string()),
        )
    }

    /// Delivery gateway that always fails, to prove failures stay non-fatal.
    struct FailingSender;

    impl EmailSender for FailingSender {
        fn send_verification_email(&self, _to: &str, _url: &str) -> Result<()> {
            bail!("smtp unreachable")
        }

        fn send_password_reset_email(&self, _to: &str, _url: &str) -> Result<()> {
            bail!("smtp unreachable")
        }
    }

    #[tokio::test]
    async fn register_starts_unverified_with_zero_failures() -> Result<()> {
        let service = service();
        let summary = service.register("A@X.com ", "password1").await?;
        assert_eq!(summary.email, "a@x.com");
        assert!(!summary.is_verified);

        let account = service.store.find_by_id(summary.id).await?;
        let Some(account) = account else {
            bail!("account missing after registration");
        };
        assert_eq!(account.failed_login_attempts, 0);
        assert!(account.lock_until.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() -> Result<()> {
        let service = service();
        service.register("a@x.com", "password1").await?;
        let result = service.register("A@X.COM", "password2").await;
        assert!(matches!(result, Err(AuthError::Conflict)));
        Ok(())
    }

    #[tokio::test]
    async fn register_validates_input() {
        let service = service();
        assert!(matches!(
            service.register("not-an-email", "password1").await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            service.register("a@x.com", "short").await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn register_succeeds_when_delivery_fails() -> Result<()> {
        let service = AccountService::new(
            Arc::new(MemoryCredentialStore::new()),
            token_service(),
            Arc::new(FailingSender),
            EmailLinks::new("https://app.custos.dev".to_string()),
        );
        let summary = service.register("a@x.com", "password1").await?;
        assert_eq!(summary.email, "a@x.com");
        Ok(())
    }

    #[tokio::test]
    async fn verify_email_is_idempotent() -> Result<()> {
        let service = service();
        let summary = service.register("a@x.com", "password1").await?;

        let tokens = token_service();
        let token = tokens.issue(TokenKind::EmailVerification, summary.id, &summary.email)?;

        assert_eq!(service.verify_email(&token).await?, VerifyOutcome::Verified);
        assert_eq!(
            service.verify_email(&token).await?,
            VerifyOutcome::AlreadyVerified
        );
        Ok(())
    }

    #[tokio::test]
    async fn verify_email_rejects_wrong_kind() -> Result<()> {
        let service = service();
        let summary = service.register("a@x.com", "password1").await?;

        let token = token_service().issue(TokenKind::Access, summary.id, &summary.email)?;
        assert!(matches!(
            service.verify_email(&token).await,
            Err(AuthError::InvalidToken)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn verify_email_unknown_subject_is_not_found() -> Result<()> {
        let service = service();
        let token =
            token_service().issue(TokenKind::EmailVerification, Uuid::new_v4(), "gone@x.com")?;
        assert!(matches!(
            service.verify_email(&token).await,
            Err(AuthError::NotFound)
        ));
        Ok(())
    }

    async fn registered_and_verified(service: &AccountService, email: &str) -> Result<Uuid> {
        let summary = service.register(email, "password1").await?;
        let token = token_service().issue(TokenKind::EmailVerification, summary.id, email)?;
        service.verify_email(&token).await?;
        Ok(summary.id)
    }

    #[tokio::test]
    async fn login_requires_verification_only_after_password_match() -> Result<()> {
        let service = service();
        service.register("a@x.com", "password1").await?;

        // Wrong password on an unverified account must not reveal verification state.
        let result = service.login("a@x.com", "wrong-password").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));

        let result = service.login("a@x.com", "password1").await;
        assert!(matches!(result, Err(AuthError::VerificationRequired)));
        Ok(())
    }

    #[tokio::test]
    async fn login_unknown_email_matches_wrong_password() {
        let service = service();
        let result = service.login("nobody@x.com", "password1").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn login_locks_after_threshold_and_resets_on_success() -> Result<()> {
        let service = service();
        let id = registered_and_verified(&service, "a@x.com").await?;

        for attempt in 1..=MAX_FAILED_LOGIN_ATTEMPTS {
            let result = service.login("a@x.com", "wrong-password").await;
            assert!(
                matches!(result, Err(AuthError::InvalidCredentials)),
                "attempt {attempt} should fail with invalid credentials"
            );
        }

        // Even the correct password is refused while the window is open.
        let result = service.login("a@x.com", "password1").await;
        let Err(AuthError::AccountLocked { minutes }) = result else {
            bail!("expected account locked, got {result:?}");
        };
        assert!(minutes >= 1);

        // Simulate the window elapsing, then a correct login resets state.
        service.store.reset_failed_attempts(id).await?;
        let success = service.login("a@x.com", "password1").await?;
        assert_eq!(success.account.id, id);

        let account = service.store.find_by_id(id).await?;
        let Some(account) = account else {
            bail!("account missing");
        };
        assert_eq!(account.failed_login_attempts, 0);
        assert!(account.lock_until.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn login_issues_access_and_refresh_tokens() -> Result<()> {
        let service = service();
        let id = registered_and_verified(&service, "a@x.com").await?;

        let success = service.login("a@x.com", "password1").await?;
        let tokens = token_service();
        let access = tokens.validate(TokenKind::Access, &success.tokens.access_token)?;
        let refresh = tokens.validate(TokenKind::Refresh, &success.tokens.refresh_token)?;
        assert_eq!(access.sub, id);
        assert_eq!(refresh.sub, id);
        Ok(())
    }

    #[tokio::test]
    async fn refresh_rotates_pair() -> Result<()> {
        let service = service();
        registered_and_verified(&service, "a@x.com").await?;
        let success = service.login("a@x.com", "password1").await?;

        let pair = service
            .refresh_tokens(&success.tokens.refresh_token)
            .await?;
        assert!(token_service()
            .validate(TokenKind::Access, &pair.access_token)
            .is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn refresh_rejects_access_token() -> Result<()> {
        let service = service();
        registered_and_verified(&service, "a@x.com").await?;
        let success = service.login("a@x.com", "password1").await?;

        let result = service.refresh_tokens(&success.tokens.access_token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
        Ok(())
    }

    #[tokio::test]
    async fn refresh_for_vanished_subject_is_not_found() -> Result<()> {
        let service = service();
        let token = token_service().issue(TokenKind::Refresh, Uuid::new_v4(), "gone@x.com")?;
        assert!(matches!(
            service.refresh_tokens(&token).await,
            Err(AuthError::NotFound)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn reset_request_is_opaque_for_unknown_and_unverified() -> Result<()> {
        let service = service();
        // Unknown account: generic success.
        service.request_password_reset("nobody@x.com").await?;

        // Unverified account: silently declined, still generic success.
        service.register("a@x.com", "password1").await?;
        service.request_password_reset("a@x.com").await?;
        Ok(())
    }

    #[tokio::test]
    async fn completed_reset_replaces_password_and_clears_lock() -> Result<()> {
        let service = service();
        let id = registered_and_verified(&service, "a@x.com").await?;

        for _ in 0..MAX_FAILED_LOGIN_ATTEMPTS {
            let _ = service.login("a@x.com", "wrong-password").await;
        }

        let token = token_service().issue(TokenKind::PasswordReset, id, "a@x.com")?;
        service
            .complete_password_reset(&token, "new-password-1")
            .await?;

        let success = service.login("a@x.com", "new-password-1").await?;
        assert_eq!(success.account.id, id);

        let result = service.login("a@x.com", "password1").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        Ok(())
    }

    #[tokio::test]
    async fn reset_completion_requires_reset_kind() -> Result<()> {
        let service = service();
        let id = registered_and_verified(&service, "a@x.com").await?;

        let token = token_service().issue(TokenKind::EmailVerification, id, "a@x.com")?;
        let result = service.complete_password_reset(&token, "new-password-1").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
        Ok(())
    }

    #[tokio::test]
    async fn normalize_and_validate_helpers() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
        assert!(valid_email("a@example.com"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-domain@"));
    }
}
