//! Outbound email for password resets.

use crate::APP_USER_AGENT;
use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tracing::{info, info_span, Instrument};

const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to_email: String,
    pub from_email: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl EmailMessage {
    #[must_use]
    pub fn password_reset(to_email: &str, from_email: &str, reset_url: &str) -> Self {
        Self {
            to_email: to_email.to_string(),
            from_email: from_email.to_string(),
            subject: "Password reset".to_string(),
            text: format!("Here's your password reset link: {reset_url}"),
            html: format!(r#"<a href="{reset_url}">Click here to reset</a>"#),
        }
    }
}

pub trait EmailSender: Send + Sync {
    fn send(&self, message: &EmailMessage) -> impl Future<Output = Result<()>> + Send;
}

/// Logs messages instead of sending them.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            subject = %message.subject,
            "email send stub"
        );
        Ok(())
    }
}

/// Delivers through the SendGrid v3 mail API.
#[derive(Clone, Debug)]
pub struct SendGridSender {
    client: Client,
    api_key: SecretString,
    url: String,
}

impl SendGridSender {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: SecretString) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build email client")?;
        Ok(Self {
            client,
            api_key,
            url: SENDGRID_URL.to_string(),
        })
    }

    #[must_use]
    pub fn with_url(mut self, url: String) -> Self {
        self.url = url;
        self
    }
}

fn sendgrid_body(message: &EmailMessage) -> serde_json::Value {
    json!({
        "personalizations": [{ "to": [{ "email": message.to_email }] }],
        "from": { "email": message.from_email },
        "subject": message.subject,
        "content": [
            { "type": "text/plain", "value": message.text },
            { "type": "text/html", "value": message.html },
        ],
    })
}

impl EmailSender for SendGridSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let span = info_span!("email.send", email.provider = "sendgrid");
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&sendgrid_body(message))
            .send()
            .instrument(span)
            .await
            .context("failed to reach sendgrid")?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(anyhow!("sendgrid rejected message: {status}"))
        }
    }
}

/// Sender selected at startup.
#[derive(Clone, Debug)]
pub enum Mailer {
    Log(LogEmailSender),
    SendGrid(SendGridSender),
}

impl EmailSender for Mailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        match self {
            Self::Log(sender) => sender.send(message).await,
            Self::SendGrid(sender) => sender.send(message).await,
        }
    }
}
