pub mod server;

use anyhow::Result;

/// Actions the CLI can resolve to.
pub enum Action {
    Server(server::Args),
}

impl Action {
    /// Execute the resolved action.
    ///
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> Result<()> {
        match self {
            Self::Server(args) => server::execute(args).await,
        }
    }
}
