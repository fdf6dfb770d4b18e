//! End-to-end credential lifecycle against the in-memory store.
//!
//! These tests drive the same service the HTTP handlers call, with a mailer
//! that captures outbound links so tokens can be pulled from them the way a
//! user would click through.

use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use std::sync::{Arc, Mutex};

use custos::account::{
    AccountService, AuthError, MemoryCredentialStore, VerifyOutcome, MAX_FAILED_LOGIN_ATTEMPTS,
};
use custos::email::{EmailLinks, EmailSender};
use custos::token::{TokenKind, TokenLifetimes, TokenSecrets, TokenService};

/// Records every outbound link instead of delivering it.
#[derive(Default)]
struct CaptureSender {
    verification_urls: Mutex<Vec<String>>,
    reset_urls: Mutex<Vec<String>>,
}

impl EmailSender for CaptureSender {
    fn send_verification_email(&self, _to_email: &str, verify_url: &str) -> Result<()> {
        self.verification_urls
            .lock()
            .expect("capture lock poisoned")
            .push(verify_url.to_string());
        Ok(())
    }

    fn send_password_reset_email(&self, _to_email: &str, reset_url: &str) -> Result<()> {
        self.reset_urls
            .lock()
            .expect("capture lock poisoned")
            .push(reset_url.to_string());
        Ok(())
    }
}

impl CaptureSender {
    fn last_verification_token(&self) -> Option<String> {
        let urls = self.verification_urls.lock().expect("capture lock poisoned");
        urls.last().and_then(|url| token_from_url(url))
    }

    fn last_reset_token(&self) -> Option<String> {
        let urls = self.reset_urls.lock().expect("capture lock poisoned");
        urls.last().and_then(|url| token_from_url(url))
    }

    fn reset_email_count(&self) -> usize {
        self.reset_urls.lock().expect("capture lock poisoned").len()
    }
}

fn token_from_url(url: &str) -> Option<String> {
    url.split("token=").nth(1).map(str::to_string)
}

fn token_service() -> Arc<TokenService> {
    Arc::new(TokenService::new(
        &TokenSecrets {
            access: SecretString::from("lifecycle-access-secret"),
            refresh: SecretString::from("lifecycle-refresh-secret"),
            email_verification: SecretString::from("lifecycle-email-secret"),
            password_reset: SecretString::from("lifecycle-reset-secret"),
        },
        TokenLifetimes::new(),
    ))
}

fn harness() -> (AccountService, Arc<CaptureSender>, Arc<TokenService>) {
    let mailer = Arc::new(CaptureSender::default());
    let tokens = token_service();
    let service = AccountService::new(
        Arc::new(MemoryCredentialStore::new()),
        tokens.clone(),
        mailer.clone(),
        EmailLinks::new("https://app.custos.dev".to_string()),
    );
    (service, mailer, tokens)
}

#[tokio::test]
async fn register_verify_login_refresh() -> Result<()> {
    let (service, mailer, tokens) = harness();

    let summary = service.register("alice@example.com", "hunter2-hunter2").await?;
    assert!(!summary.is_verified);

    // Login before verification needs the right password, then is refused.
    let result = service.login("alice@example.com", "hunter2-hunter2").await;
    assert!(matches!(result, Err(AuthError::VerificationRequired)));

    // Click the emailed link.
    let token = mailer
        .last_verification_token()
        .context("no verification email captured")?;
    assert_eq!(service.verify_email(&token).await?, VerifyOutcome::Verified);

    let success = service.login("alice@example.com", "hunter2-hunter2").await?;
    assert!(success.account.is_verified);

    // The issued pair validates under the right kinds.
    let claims = tokens.validate(TokenKind::Access, &success.tokens.access_token)?;
    assert_eq!(claims.sub, success.account.id);
    assert_eq!(claims.email, "alice@example.com");

    let pair = service.refresh_tokens(&success.tokens.refresh_token).await?;
    assert!(tokens.validate(TokenKind::Refresh, &pair.refresh_token).is_ok());

    // The /me lookup resolves the account from the token subject.
    let me = service.account_summary(claims.sub).await?;
    assert_eq!(me.email, "alice@example.com");
    Ok(())
}

#[tokio::test]
async fn verification_link_is_idempotent_and_resendable() -> Result<()> {
    let (service, mailer, _tokens) = harness();

    service.register("bob@example.com", "long-enough-pass").await?;
    let first = mailer
        .last_verification_token()
        .context("no verification email captured")?;

    // A resend mints a fresh link; both remain usable until expiry.
    service.resend_verification("bob@example.com").await?;
    let second = mailer
        .last_verification_token()
        .context("no resend email captured")?;

    assert_eq!(service.verify_email(&second).await?, VerifyOutcome::Verified);
    assert_eq!(
        service.verify_email(&first).await?,
        VerifyOutcome::AlreadyVerified
    );

    // Resend after verification stays quiet and sends nothing new.
    let before = mailer
        .verification_urls
        .lock()
        .expect("capture lock poisoned")
        .len();
    service.resend_verification("bob@example.com").await?;
    let after = mailer
        .verification_urls
        .lock()
        .expect("capture lock poisoned")
        .len();
    assert_eq!(before, after);
    Ok(())
}

#[tokio::test]
async fn lockout_opens_and_reset_recovers() -> Result<()> {
    let (service, mailer, _tokens) = harness();

    service.register("carol@example.com", "original-pass").await?;
    let token = mailer
        .last_verification_token()
        .context("no verification email captured")?;
    service.verify_email(&token).await?;

    for _ in 0..MAX_FAILED_LOGIN_ATTEMPTS {
        let result = service.login("carol@example.com", "wrong-pass").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    // Window is open: even the correct password is refused.
    let result = service.login("carol@example.com", "original-pass").await;
    let Err(AuthError::AccountLocked { minutes }) = result else {
        bail!("expected lock, got {result:?}");
    };
    assert!((1..=15).contains(&minutes));

    // Recovery path: forgot password, click the link, set a new password.
    service.request_password_reset("carol@example.com").await?;
    let reset_token = mailer
        .last_reset_token()
        .context("no reset email captured")?;
    service
        .complete_password_reset(&reset_token, "replacement-pass")
        .await?;

    // Reset cleared the lock and the counter.
    let success = service.login("carol@example.com", "replacement-pass").await?;
    assert_eq!(success.account.email, "carol@example.com");

    let result = service.login("carol@example.com", "original-pass").await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    Ok(())
}

#[tokio::test]
async fn forgot_password_does_not_leak_account_state() -> Result<()> {
    let (service, mailer, _tokens) = harness();

    // Unknown address: generic success, nothing sent.
    service.request_password_reset("ghost@example.com").await?;
    assert_eq!(mailer.reset_email_count(), 0);

    // Unverified account: same generic success, still nothing sent.
    service.register("dave@example.com", "some-password").await?;
    service.request_password_reset("dave@example.com").await?;
    assert_eq!(mailer.reset_email_count(), 0);

    // Verified account: the only case that actually gets an email.
    let token = mailer
        .last_verification_token()
        .context("no verification email captured")?;
    service.verify_email(&token).await?;
    service.request_password_reset("dave@example.com").await?;
    assert_eq!(mailer.reset_email_count(), 1);
    Ok(())
}

#[tokio::test]
async fn tokens_do_not_cross_purposes() -> Result<()> {
    let (service, mailer, _tokens) = harness();

    service.register("erin@example.com", "a-fine-password").await?;
    let verification = mailer
        .last_verification_token()
        .context("no verification email captured")?;

    // A verification token opens neither sessions nor resets.
    assert!(matches!(
        service.refresh_tokens(&verification).await,
        Err(AuthError::InvalidToken)
    ));
    assert!(matches!(
        service
            .complete_password_reset(&verification, "new-password-1")
            .await,
        Err(AuthError::InvalidToken)
    ));

    // It still does its own job afterwards.
    assert_eq!(
        service.verify_email(&verification).await?,
        VerifyOutcome::Verified
    );
    Ok(())
}
