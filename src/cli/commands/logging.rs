use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names in verbosity order; the index is the `-v` count.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accepts a level name or its `-v` count, as given in `PASSAGE_LOG_LEVEL`.
fn parse_log_level(level: &str) -> Result<u8, String> {
    let level = level.trim().to_ascii_lowercase();

    let index = match level.parse::<usize>() {
        Ok(count) => Some(count).filter(|count| *count < LEVEL_NAMES.len()),
        Err(_) => LEVEL_NAMES.iter().position(|name| *name == level),
    };

    index
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| format!("invalid log level '{level}', expected one of {LEVEL_NAMES:?}"))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Increase log verbosity (-v warn, -vv info, -vvv debug, -vvvv trace)")
            .env("PASSAGE_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(ValueParser::new(parse_log_level)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_counts() {
        assert_eq!(parse_log_level("error"), Ok(0));
        assert_eq!(parse_log_level(" Debug "), Ok(3));
        assert_eq!(parse_log_level("TRACE"), Ok(4));
        assert_eq!(parse_log_level("2"), Ok(2));
    }

    #[test]
    fn rejects_unknown_levels() {
        assert!(parse_log_level("verbose").is_err());
        assert!(parse_log_level("5").is_err());
        assert!(parse_log_level("").is_err());
    }
}
