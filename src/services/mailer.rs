use async_trait::async_trait;
use chrono::Duration;
use serde::Serialize;
use thiserror::Error;

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport error: {0}")]
    Transport(String),

    #[error("Mail API returned status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Outbound email delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// Posts `{from, to, subject, html}` to an HTTP mail API with a bearer key.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }
}

#[derive(Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&MailRequest {
                from: &self.from,
                to: &email.to,
                subject: &email.subject,
                html: &email.html,
            })
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("Email '{}' delivered to mail API", email.subject);
        Ok(())
    }
}

/// Logs recipient and subject instead of sending. Development only; the
/// body carries one-time links and is never logged.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        tracing::warn!(
            "MAIL_API_KEY not set; email '{}' to {} not sent",
            email.subject,
            email.to
        );
        Ok(())
    }
}

/// Picks the HTTP transport when a key is configured, else [`LogMailer`].
pub fn mailer_from_config(config: &MailConfig) -> std::sync::Arc<dyn Mailer> {
    match &config.api_key {
        Some(key) => std::sync::Arc::new(HttpMailer::new(&config.api_url, key, &config.from)),
        None => std::sync::Arc::new(LogMailer),
    }
}

/// Invitation message carrying the set-password link.
pub fn invite_email(to: &str, site_domain: &str, token: &str, valid_for: Duration) -> OutgoingEmail {
    let link = format!("{}/reset-password?token={}", site_domain.trim_end_matches('/'), token);
    let expiry = match valid_for.num_hours() {
        1 => "1 hour".to_string(),
        hours if hours > 1 => format!("{} hours", hours),
        _ => format!("{} minutes", valid_for.num_minutes().max(1)),
    };
    OutgoingEmail {
        to: to.to_string(),
        subject: "You're invited: set your password".to_string(),
        html: format!(
            "<p>You have been invited to the admin dashboard.</p>\
             <p><a href=\"{link}\">Set your password</a></p>\
             <p>This link expires in {expiry}.</p>"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_link_embeds_raw_token() {
        let email = invite_email(
            "ada@example.com",
            "https://admin.example.com/",
            "abc.def.ghi",
            Duration::hours(24),
        );
        assert_eq!(email.to, "ada@example.com");
        assert!(email
            .html
            .contains("https://admin.example.com/reset-password?token=abc.def.ghi"));
    }

    #[tokio::test]
    async fn config_without_key_uses_log_mailer() {
        let config = MailConfig {
            api_url: "https://api.resend.com/emails".into(),
            api_key: None,
            from: "noreply@example.com".into(),
        };
        let mailer = mailer_from_config(&config);
        assert!(mailer
            .send(invite_email("a@b.co", "http://x", "t", Duration::hours(24)))
            .await
            .is_ok());
    }

    #[test]
    fn expiry_text_follows_token_lifetime() {
        let email = invite_email("a@b.co", "http://x", "t", Duration::hours(48));
        assert!(email.html.contains("expires in 48 hours"));

        let email = invite_email("a@b.co", "http://x", "t", Duration::hours(1));
        assert!(email.html.contains("expires in 1 hour."));

        let email = invite_email("a@b.co", "http://x", "t", Duration::minutes(30));
        assert!(email.html.contains("expires in 30 minutes"));
    }
}
