//! Outbound email collaborator.
//!
//! Production delivery goes over SMTP via lettre. When no SMTP host is
//! configured the [`LogMailer`] stands in and logs the message body, which
//! keeps the verification workflows usable in development.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, warn};

use crate::config::EmailConfig;
use crate::domain::DomainError;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DomainError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self, DomainError> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| DomainError::internal("SMTP host is not configured"))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| DomainError::internal(format!("Invalid SMTP relay '{}': {}", host, e)))?
            .port(config.smtp_port);

        if let (Some(user), Some(password)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DomainError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|e| DomainError::upstream(format!("Invalid sender address: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| DomainError::upstream(format!("Invalid recipient address: {}", e)))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| DomainError::upstream(format!("Failed to build email: {}", e)))?;

        self.transport.send(message).await.map_err(|e| {
            warn!(to, error = %e, "email delivery failed");
            DomainError::upstream(format!("Failed to send email: {}", e))
        })?;

        info!(to, subject, "email sent");
        Ok(())
    }
}

/// Development fallback: logs instead of delivering.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DomainError> {
        info!(to, subject, body, "email delivery skipped (no SMTP host configured)");
        Ok(())
    }
}
