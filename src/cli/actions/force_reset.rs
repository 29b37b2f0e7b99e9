use crate::{
    auth::utils::normalize_email,
    passage,
    store::{PgUserStore, UserStore},
};
use anyhow::{bail, Result};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub dsn: String,
    pub email: String,
}

/// Mark one account so every outstanding bearer token is refused until the
/// user completes a password reset.
/// # Errors
/// Returns an error if the database is unreachable or no account matches.
pub async fn execute(args: Args) -> Result<()> {
    let pool = passage::connect(&args.dsn).await?;
    let store = PgUserStore::new(pool);
    let email = normalize_email(&args.email);

    if !store.require_reset(&email).await? {
        bail!("no account found for {email}");
    }

    info!(email = %email, "Account locked until password reset");

    Ok(())
}
