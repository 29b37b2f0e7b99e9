use clap::{Arg, Command};

pub const ARG_EMAIL_FROM: &str = "email-from";
pub const ARG_SENDGRID_API_KEY: &str = "sendgrid-api-key";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_EMAIL_FROM)
                .long(ARG_EMAIL_FROM)
                .help("Sender address for password reset emails")
                .env("PASSAGE_EMAIL_FROM")
                .default_value("do@not.reply"),
        )
        .arg(
            Arg::new(ARG_SENDGRID_API_KEY)
                .long(ARG_SENDGRID_API_KEY)
                .help("SendGrid API key; when absent emails are only logged")
                .env("PASSAGE_SENDGRID_API_KEY")
                .hide_env_values(true),
        )
}
