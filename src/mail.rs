use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;

use crate::config::MailConfig;
use crate::error::{Error, Result};

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Outbound email used by the password reset flow.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, to: &str, reset_link: &str) -> Result<()>;
}

/// Development mailer that writes the reset link to the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, to: &str, reset_link: &str) -> Result<()> {
        tracing::info!(to = %to, link = %reset_link, "Password reset requested");
        Ok(())
    }
}

pub struct SendGridMailer {
    client: reqwest::Client,
    api_key: String,
    from_email: String,
    link_ttl: chrono::Duration,
}

impl SendGridMailer {
    pub fn new(
        api_key: &str,
        from_email: &str,
        timeout: Duration,
        link_ttl: chrono::Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("mail client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            from_email: from_email.to_string(),
            link_ttl,
        })
    }

    fn reset_email_html(&self, reset_link: &str) -> String {
        format!(
            "<p>Someone asked to reset the password for this account.</p>\
             <p><a href=\"{reset_link}\">Choose a new password</a></p>\
             <p>The link expires in {}. If this wasn't you, ignore this email.</p>",
            describe_ttl(self.link_ttl)
        )
    }
}

fn describe_ttl(ttl: chrono::Duration) -> String {
    match ttl.num_minutes() {
        1 => "1 minute".to_string(),
        60 => "1 hour".to_string(),
        m if m % 60 == 0 => format!("{} hours", m / 60),
        m => format!("{m} minutes"),
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send_password_reset(&self, to: &str, reset_link: &str) -> Result<()> {
        let body = json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.from_email },
            "subject": "Reset your Memolink password",
            "content": [{
                "type": "text/html",
                "value": self.reset_email_html(reset_link),
            }],
        });

        let response = self
            .client
            .post(SENDGRID_SEND_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout("mail delivery")
                } else {
                    Error::Upstream {
                        message: format!("mail delivery: {e}"),
                        retryable: e.is_connect(),
                    }
                }
            })?;

        check_status(response.status())
    }
}

fn check_status(status: StatusCode) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }

    Err(Error::Upstream {
        message: format!("mail provider returned {status}"),
        retryable: status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error(),
    })
}

/// Picks SendGrid when an API key is configured, the log mailer otherwise.
pub fn from_config(
    config: &MailConfig,
    timeout: Duration,
    link_ttl: chrono::Duration,
) -> Result<Arc<dyn Mailer>> {
    match config.sendgrid_api_key.as_deref() {
        Some(key) if !key.is_empty() => Ok(Arc::new(SendGridMailer::new(
            key,
            &config.from_email,
            timeout,
            link_ttl,
        )?)),
        _ => {
            tracing::warn!("No SendGrid API key configured, reset emails will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}
