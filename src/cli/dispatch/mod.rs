use crate::cli::{
    actions::{force_reset, server, Action},
    commands::{
        auth::{ARG_FRONTEND_URL, ARG_RESET_TTL_SECONDS, ARG_SECRET},
        email::{ARG_EMAIL_FROM, ARG_SENDGRID_API_KEY},
        ARG_DSN, ARG_EMAIL, ARG_PORT, CMD_FORCE_RESET,
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use url::Url;

fn dsn(matches: &clap::ArgMatches) -> Result<String> {
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    Url::parse(&dsn).context("invalid PASSAGE_DSN")?;

    Ok(dsn)
}

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    if let Some(sub_m) = matches.subcommand_matches(CMD_FORCE_RESET) {
        let email = sub_m
            .get_one::<String>(ARG_EMAIL)
            .cloned()
            .context("missing required argument: --email")?;

        return Ok(Action::ForceReset(force_reset::Args {
            dsn: dsn(sub_m)?,
            email,
        }));
    }

    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let secret = matches
        .get_one::<String>(ARG_SECRET)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --secret")?;

    let frontend_url = matches
        .get_one::<String>(ARG_FRONTEND_URL)
        .cloned()
        .context("missing required argument: --frontend-url")?;
    Url::parse(&frontend_url).context("invalid PASSAGE_FRONTEND_URL")?;

    let reset_ttl_seconds = matches
        .get_one::<i64>(ARG_RESET_TTL_SECONDS)
        .copied()
        .context("missing required argument: --reset-ttl-seconds")?;

    let email_from = matches
        .get_one::<String>(ARG_EMAIL_FROM)
        .cloned()
        .context("missing required argument: --email-from")?;

    let sendgrid_api_key = matches
        .get_one::<String>(ARG_SENDGRID_API_KEY)
        .cloned()
        .map(SecretString::from);

    Ok(Action::Server(server::Args {
        port,
        dsn: dsn(matches)?,
        secret,
        frontend_url,
        reset_ttl_seconds,
        email_from,
        sendgrid_api_key,
    }))
}
