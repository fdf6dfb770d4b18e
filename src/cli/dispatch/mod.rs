//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::secrets;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;
    let frontend_base_url = matches
        .get_one::<String>("frontend-base-url")
        .cloned()
        .context("missing required argument: --frontend-base-url")?;

    let secret_opts = secrets::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_base_url,
        secrets: secret_opts.secrets,
        lifetimes: secret_opts.lifetimes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;
    use secrecy::ExposeSecret;

    fn with_full_env<T>(overrides: &[(&str, Option<&str>)], test: impl FnOnce() -> T) -> T {
        let mut vars: Vec<(&str, Option<&str>)> = vec![
            ("CUSTOS_DSN", Some("postgres://localhost/custos")),
            ("CUSTOS_ACCESS_TOKEN_SECRET", Some("access-secret")),
            ("CUSTOS_REFRESH_TOKEN_SECRET", Some("refresh-secret")),
            ("CUSTOS_EMAIL_TOKEN_SECRET", Some("email-secret")),
            ("CUSTOS_RESET_TOKEN_SECRET", Some("reset-secret")),
            ("CUSTOS_ACCESS_TOKEN_TTL_SECONDS", None),
            ("CUSTOS_PORT", None),
        ];
        for (key, value) in overrides {
            vars.retain(|(existing, _)| existing != key);
            vars.push((key, *value));
        }
        temp_env::with_vars(vars, test)
    }

    #[test]
    fn dispatches_server_action() -> Result<()> {
        with_full_env(&[], || {
            let matches = crate::cli::commands::new().get_matches_from(vec!["custos"]);
            let Action::Server(args) = handler(&matches)?;
            assert_eq!(args.port, 8080);
            assert_eq!(args.dsn, "postgres://localhost/custos");
            assert_eq!(args.frontend_base_url, "https://custos.dev");
            assert_eq!(args.secrets.access.expose_secret(), "access-secret");
            assert_eq!(args.lifetimes.seconds_for(TokenKind::Access), 86_400);
            Ok(())
        })
    }

    #[test]
    fn ttl_overrides_are_applied() -> Result<()> {
        with_full_env(
            &[("CUSTOS_ACCESS_TOKEN_TTL_SECONDS", Some("3600"))],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["custos"]);
                let Action::Server(args) = handler(&matches)?;
                assert_eq!(args.lifetimes.seconds_for(TokenKind::Access), 3600);
                assert_eq!(args.lifetimes.seconds_for(TokenKind::Refresh), 604_800);
                Ok(())
            },
        )
    }

    #[test]
    fn empty_secret_is_an_error() {
        with_full_env(&[("CUSTOS_ACCESS_TOKEN_SECRET", Some("  "))], || {
            let matches = crate::cli::commands::new().get_matches_from(vec!["custos"]);
            assert!(handler(&matches).is_err());
        });
    }
}
