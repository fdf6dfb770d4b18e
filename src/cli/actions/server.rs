use crate::api::{self, ServerConfig};
use crate::token::{TokenLifetimes, TokenSecrets};
use anyhow::Result;
use tracing::debug;

pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub secrets: TokenSecrets,
    pub lifetimes: TokenLifetimes,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!(
        port = args.port,
        frontend_base_url = %args.frontend_base_url,
        "starting server"
    );

    api::new(
        args.port,
        args.dsn,
        ServerConfig {
            frontend_base_url: args.frontend_base_url,
            secrets: args.secrets,
            lifetimes: args.lifetimes,
        },
    )
    .await
}
