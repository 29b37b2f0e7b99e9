//! Small helpers for credential input.

use regex::Regex;
use std::sync::LazyLock;

static EMAIL_FORMAT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    EMAIL_FORMAT
        .as_ref()
        .is_some_and(|regex| regex.is_match(email_normalized))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" A@X.Com "), "a@x.com");
    }

    #[test]
    fn valid_email_basic_format() {
        assert!(valid_email("a@x.com"));
        assert!(!valid_email("a@x"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email(""));
        assert!(!valid_email("a b@x.com"));
    }

    #[test]
    fn email_format_compiles() {
        assert!(EMAIL_FORMAT.is_some());
    }
}
