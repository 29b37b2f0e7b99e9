use crate::cli::actions::{force_reset, server, Action};
use anyhow::Result;

/// Execute the provided action.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Server(args) => server::execute(args).await,
        Action::ForceReset(args) => force_reset::execute(args).await,
    }
}
