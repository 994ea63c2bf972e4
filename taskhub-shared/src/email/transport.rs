/// Mail delivery transports
///
/// The [`MailTransport`] trait is the seam between the dispatcher and the
/// outside world. Production uses [`SmtpMailer`]; tests use [`MockMailer`]
/// and assert on what was recorded.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Mutex;
use thiserror::Error;

/// Mail delivery error
#[derive(Debug, Error)]
pub enum MailError {
    /// Message construction failed (bad address, invalid header)
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Transport-level delivery failure
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
}

/// A fully rendered outbound email
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// SMTP connection settings
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// RFC 5322 From address, e.g. "TaskHub <noreply@taskhub.io>"
    pub from: String,
}

/// Delivery seam for outbound email
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// SMTP delivery via lettre
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    /// Builds a pooled SMTP transport with STARTTLS
    ///
    /// # Errors
    ///
    /// Returns `MailError::InvalidMessage` if the relay host is invalid.
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| MailError::InvalidMessage(format!("Bad SMTP relay: {}", e)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let email = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| MailError::InvalidMessage(format!("Bad from address: {}", e)))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|e| MailError::InvalidMessage(format!("Bad to address: {}", e)))?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(message.html_body.clone())
            .map_err(|e| MailError::InvalidMessage(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::DeliveryFailed(e.to_string()))?;

        Ok(())
    }
}

/// In-memory transport that records every message
///
/// Used in tests and when SMTP is disabled in development.
#[derive(Default)]
pub struct MockMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages delivered so far, in order
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl MailTransport for MockMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_mailer_records_messages() {
        let mailer = MockMailer::new();
        let message = EmailMessage {
            to: "user@example.com".to_string(),
            subject: "Hello".to_string(),
            html_body: "<p>Hi</p>".to_string(),
        };

        mailer.send(&message).await.unwrap();
        mailer.send(&message).await.unwrap();

        assert_eq!(mailer.sent_count(), 2);
        assert_eq!(mailer.sent()[0], message);
    }
}
