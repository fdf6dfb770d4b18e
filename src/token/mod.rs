//! Stateless signed-token issuance and validation.
//!
//! Four token kinds, each signed with an independent secret. The kind tag
//! travels inside the signed payload, so a token minted for one purpose cannot
//! be replayed for another even if the secrets were ever shared. There is no
//! persisted token table: validity is purely signature + kind + expiry.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature, wrong kind tag, or expired. Collapsed on purpose so the
    /// error cannot be used as an oracle.
    #[error("invalid or expired token")]
    Invalid,

    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
    Access,
    Refresh,
    EmailVerification,
    PasswordReset,
}

impl TokenKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
            Self::EmailVerification => "email-verification",
            Self::PasswordReset => "password-reset",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Access => 0,
            Self::Refresh => 1,
            Self::EmailVerification => 2,
            Self::PasswordReset => 3,
        }
    }
}

/// Signed claims carried by every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id the token is bound to.
    pub sub: Uuid,
    pub email: String,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// One independent secret per token kind, provisioned at startup.
pub struct TokenSecrets {
    pub access: SecretString,
    pub refresh: SecretString,
    pub email_verification: SecretString,
    pub password_reset: SecretString,
}

/// Per-kind lifetimes in seconds.
#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    access_seconds: i64,
    refresh_seconds: i64,
    email_verification_seconds: i64,
    password_reset_seconds: i64,
}

impl TokenLifetimes {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            access_seconds: 86_400,
            refresh_seconds: 604_800,
            email_verification_seconds: 600,
            password_reset_seconds: 600,
        }
    }

    #[must_use]
    pub const fn with_access_seconds(mut self, seconds: i64) -> Self {
        self.access_seconds = seconds;
        self
    }

    #[must_use]
    pub const fn with_refresh_seconds(mut self, seconds: i64) -> Self {
        self.refresh_seconds = seconds;
        self
    }

    #[must_use]
    pub const fn with_email_verification_seconds(mut self, seconds: i64) -> Self {
        self.email_verification_seconds = seconds;
        self
    }

    #[must_use]
    pub const fn with_password_reset_seconds(mut self, seconds: i64) -> Self {
        self.password_reset_seconds = seconds;
        self
    }

    #[must_use]
    pub const fn seconds_for(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_seconds,
            TokenKind::Refresh => self.refresh_seconds,
            TokenKind::EmailVerification => self.email_verification_seconds,
            TokenKind::PasswordReset => self.password_reset_seconds,
        }
    }
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self::new()
    }
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        }
    }
}

/// Issues and validates the four token kinds. Pure function of the configured
/// secrets and the clock; no side effects.
pub struct TokenService {
    keys: [KeyPair; 4],
    lifetimes: TokenLifetimes,
}

impl TokenService {
    #[must_use]
    pub fn new(secrets: &TokenSecrets, lifetimes: TokenLifetimes) -> Self {
        Self {
            keys: [
                KeyPair::from_secret(&secrets.access),
                KeyPair::from_secret(&secrets.refresh),
                KeyPair::from_secret(&secrets.email_verification),
                KeyPair::from_secret(&secrets.password_reset),
            ],
            lifetimes,
        }
    }

    #[must_use]
    pub const fn lifetimes(&self) -> &TokenLifetimes {
        &self.lifetimes
    }

    /// Sign a token of `kind` bound to the given account.
    ///
    /// # Errors
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(&self, kind: TokenKind, account_id: Uuid, email: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let expires = now + Duration::seconds(self.lifetimes.seconds_for(kind));
        let claims = Claims {
            sub: account_id,
            email: email.to_string(),
            kind,
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.keys[kind.index()].encoding,
        )
        .map_err(TokenError::Signing)
    }

    /// Validate a token as `kind` and return its claims.
    ///
    /// # Errors
    /// Returns `TokenError::Invalid` on bad signature, kind mismatch, or expiry.
    pub fn validate(&self, kind: TokenKind, token: &str) -> Result<Claims, TokenError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.keys[kind.index()].decoding, &validation)
            .map_err(|_| TokenError::Invalid)?;

        if data.claims.kind != kind {
            return Err(TokenError::Invalid);
        }

        Ok(data.claims)
    }
}
