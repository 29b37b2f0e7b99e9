pub mod force_reset;
pub mod server;

// Keeps the dispatch match out of `mod.rs`.
mod run;

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
    ForceReset(force_reset::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
