//! Delivery of password-reset links.

use async_trait::async_trait;
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};
use log::{info, warn};

use crate::{config::SmtpConfig, error::AppError};

#[async_trait]
pub trait ResetMailer: Send + Sync {
    async fn send_reset(&self, to: &str, link: &str) -> Result<(), AppError>;
}

/// Picks SMTP delivery when a host is configured, log-only otherwise.
pub fn from_config(config: &SmtpConfig) -> Result<Box<dyn ResetMailer>, AppError> {
    if config.host.trim().is_empty() {
        warn!("SMTP_HOST not configured; password reset links will only be logged");
        return Ok(Box::new(LogMailer));
    }
    Ok(Box::new(SmtpMailer::new(config)?))
}

pub struct LogMailer;

#[async_trait]
impl ResetMailer for LogMailer {
    async fn send_reset(&self, to: &str, link: &str) -> Result<(), AppError> {
        info!("password reset for {}: {}", to, link);
        Ok(())
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| AppError::Mail(format!("invalid SMTP_FROM address: {}", e)))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AppError::Mail(e.to_string()))?
            .port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(SmtpMailer {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl ResetMailer for SmtpMailer {
    async fn send_reset(&self, to: &str, link: &str) -> Result<(), AppError> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| AppError::Mail(format!("invalid recipient {}: {}", to, e)))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Password Reset")
            .body(format!(
                "To reset your password, click on this link: {}",
                link
            ))
            .map_err(|e| AppError::Mail(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Mail(e.to_string()))?;
        Ok(())
    }
}
