//! Outbound mail - the seam between the reminder dispatcher and the mail provider.
//!
//! The dispatcher only sees the [`Mailer`] trait. [`SmtpMailer`] delivers through an
//! SMTP relay with STARTTLS; [`LogMailer`] is a dry-run used when no relay is configured.

use crate::config::MailConfig;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::Mailbox,
    message::header::ContentType, transport::smtp::authentication::Credentials,
};
use std::sync::Arc;
use tracing::info;

/// A fully composed email ready to hand to a [`Mailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// `From` header, e.g. `"Debt Collection <noreply@example.com>"`
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: String,
}

/// Anything that can deliver an [`OutgoingEmail`].
///
/// An `Err` means the message was not accepted, whether the provider returned an
/// error or the call itself failed.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers one message.
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

/// Delivers mail through an SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Builds a STARTTLS transport for `host:port`, authenticating when credentials
    /// are supplied.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the relay cannot be set up.
    pub fn new(host: &str, port: u16, credentials: Option<(String, String)>) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| Error::Config {
                message: format!("SMTP relay {host}: {e}"),
            })?
            .port(port);

        if let Some((username, password)) = credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let from: Mailbox = email
            .from
            .parse()
            .map_err(|e| Error::mail(format!("Invalid from address: {e}")))?;
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| Error::mail(format!("Invalid recipient {}: {e}", email.to)))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .map_err(|e| Error::mail(format!("Build email: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| Error::mail(format!("SMTP send: {e}")))?;

        Ok(())
    }
}

/// Logs emails instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        info!(to = %email.to, subject = %email.subject, "Dry run, email not sent");
        Ok(())
    }
}

/// Picks the mailer for the given settings: SMTP when a relay host is configured,
/// otherwise [`LogMailer`].
///
/// # Errors
/// Returns [`Error::EnvVar`] if `SMTP_USERNAME` is set without `SMTP_PASSWORD`, or an
/// error if the SMTP relay cannot be set up.
pub fn mailer_from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>> {
    match &config.smtp_host {
        Some(host) => {
            let credentials = match std::env::var("SMTP_USERNAME") {
                Ok(username) => Some((username, std::env::var("SMTP_PASSWORD")?)),
                Err(_) => None,
            };
            info!("Sending reminders through SMTP relay {host}:{}", config.smtp_port);
            Ok(Arc::new(SmtpMailer::new(host, config.smtp_port, credentials)?))
        }
        None => {
            info!("No SMTP relay configured, reminders will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OutgoingEmail {
        OutgoingEmail {
            from: "Debt Collection <noreply@example.com>".to_string(),
            to: "debtor@example.com".to_string(),
            subject: "Payment Reminder".to_string(),
            html: "<p>Hello</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_everything() -> Result<()> {
        LogMailer.send(&sample()).await
    }

    #[tokio::test]
    async fn test_smtp_mailer_rejects_invalid_recipient_before_connecting() -> Result<()> {
        let mailer = SmtpMailer::new("localhost", 2525, None)?;
        let mut email = sample();
        email.to = "not an address".to_string();

        let result = mailer.send(&email).await;
        assert!(matches!(result, Err(Error::Mail { .. })));
        Ok(())
    }

    #[test]
    fn test_mailer_from_config_without_host_is_dry_run() {
        let config = MailConfig::default();
        assert!(mailer_from_config(&config).is_ok());
    }
}
