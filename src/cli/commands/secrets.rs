//! Token signing secrets and lifetimes.
//!
//! Each token kind has its own secret so a leaked verification secret can be
//! rotated without invalidating sessions.

use anyhow::bail;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::token::{TokenLifetimes, TokenSecrets};

pub const ARG_ACCESS_TOKEN_SECRET: &str = "access-token-secret";
pub const ARG_REFRESH_TOKEN_SECRET: &str = "refresh-token-secret";
pub const ARG_EMAIL_TOKEN_SECRET: &str = "email-token-secret";
pub const ARG_RESET_TOKEN_SECRET: &str = "reset-token-secret";

pub fn with_args(command: Command) -> Command {
    let command = command
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_SECRET)
                .long(ARG_ACCESS_TOKEN_SECRET)
                .help("Signing secret for access tokens")
                .env("CUSTOS_ACCESS_TOKEN_SECRET")
                .required(true),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_SECRET)
                .long(ARG_REFRESH_TOKEN_SECRET)
                .help("Signing secret for refresh tokens")
                .env("CUSTOS_REFRESH_TOKEN_SECRET")
                .required(true),
        )
        .arg(
            Arg::new(ARG_EMAIL_TOKEN_SECRET)
                .long(ARG_EMAIL_TOKEN_SECRET)
                .help("Signing secret for email verification tokens")
                .env("CUSTOS_EMAIL_TOKEN_SECRET")
                .required(true),
        )
        .arg(
            Arg::new(ARG_RESET_TOKEN_SECRET)
                .long(ARG_RESET_TOKEN_SECRET)
                .help("Signing secret for password reset tokens")
                .env("CUSTOS_RESET_TOKEN_SECRET")
                .required(true),
        );

    command
        .arg(
            Arg::new("access-token-ttl-seconds")
                .long("access-token-ttl-seconds")
                .help("Access token TTL in seconds")
                .env("CUSTOS_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("refresh-token-ttl-seconds")
                .long("refresh-token-ttl-seconds")
                .help("Refresh token TTL in seconds")
                .env("CUSTOS_REFRESH_TOKEN_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("email-token-ttl-seconds")
                .long("email-token-ttl-seconds")
                .help("Email verification token TTL in seconds")
                .env("CUSTOS_EMAIL_TOKEN_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("reset-token-ttl-seconds")
                .long("reset-token-ttl-seconds")
                .help("Password reset token TTL in seconds")
                .env("CUSTOS_RESET_TOKEN_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(i64)),
        )
}

pub struct Options {
    pub secrets: TokenSecrets,
    pub lifetimes: TokenLifetimes,
}

impl Options {
    /// Parse token secret and lifetime arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a required secret is missing or empty.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get_secret = |id: &str| -> anyhow::Result<SecretString> {
            let value = matches
                .get_one::<String>(id)
                .cloned()
                .filter(|value| !value.trim().is_empty());
            match value {
                Some(value) => Ok(SecretString::from(value)),
                None => bail!("missing required argument: --{id}"),
            }
        };

        let get_ttl = |id: &str, default: i64| {
            matches.get_one::<i64>(id).copied().unwrap_or(default)
        };

        let secrets = TokenSecrets {
            access: get_secret(ARG_ACCESS_TOKEN_SECRET)?,
            refresh: get_secret(ARG_REFRESH_TOKEN_SECRET)?,
            email_verification: get_secret(ARG_EMAIL_TOKEN_SECRET)?,
            password_reset: get_secret(ARG_RESET_TOKEN_SECRET)?,
        };

        let lifetimes = TokenLifetimes::new()
            .with_access_seconds(get_ttl("access-token-ttl-seconds", 86_400))
            .with_refresh_seconds(get_ttl("refresh-token-ttl-seconds", 604_800))
            .with_email_verification_seconds(get_ttl("email-token-ttl-seconds", 600))
            .with_password_reset_seconds(get_ttl("reset-token-ttl-seconds", 600));

        Ok(Self { secrets, lifetimes })
    }
}
