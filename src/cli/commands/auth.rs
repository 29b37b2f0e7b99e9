use clap::{Arg, Command};

pub const ARG_SECRET: &str = "secret";
pub const ARG_FRONTEND_URL: &str = "frontend-url";
pub const ARG_RESET_TTL_SECONDS: &str = "reset-ttl-seconds";

/// Longest accepted reset link lifetime: one week.
pub const MAX_RESET_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SECRET)
                .long(ARG_SECRET)
                .help("Secret used to sign bearer and reset tokens")
                .long_help(
                    "Secret used to sign bearer and reset tokens. Rotating it signs every user out and invalidates outstanding reset links.",
                )
                .env("PASSAGE_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_FRONTEND_URL)
                .long(ARG_FRONTEND_URL)
                .help("Frontend base URL used for password reset links")
                .env("PASSAGE_FRONTEND_URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new(ARG_RESET_TTL_SECONDS)
                .long(ARG_RESET_TTL_SECONDS)
                .help("Password reset token TTL in seconds")
                .env("PASSAGE_RESET_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_RESET_TTL_SECONDS)),
        )
}
