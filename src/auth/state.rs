//! Auth configuration.

use url::Url;

pub const DEFAULT_RESET_TTL_SECONDS: i64 = 10 * 60;
const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_EMAIL_FROM: &str = "do@not.reply";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    reset_token_ttl_seconds: i64,
    email_from: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            reset_token_ttl_seconds: DEFAULT_RESET_TTL_SECONDS,
            email_from: DEFAULT_EMAIL_FROM.to_string(),
        }
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_email_from(mut self, email_from: String) -> Self {
        self.email_from = email_from;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn reset_token_ttl_seconds(&self) -> i64 {
        self.reset_token_ttl_seconds
    }

    #[must_use]
    pub fn email_from(&self) -> &str {
        &self.email_from
    }

    /// Link the user follows to finish a password reset.
    #[must_use]
    pub fn reset_url(&self, token: &str) -> String {
        let base = self.frontend_base_url.trim_end_matches('/');
        match Url::parse(&format!("{base}/session/change-password")) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("token", token);
                url.to_string()
            }
            Err(_) => format!("{base}/session/change-password?token={token}"),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FRONTEND_BASE_URL.to_string())
    }
}
