//! Secondary provider: pooled SMTP transport.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{authentication::Credentials, PoolConfig},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{MailError, MailMessage, MailTransport};
use crate::config::schema::SmtpConfig;

/// STARTTLS SMTP relay with a small capped connection pool, so repeated
/// invocations within a warm process reuse connections instead of leaking
/// them.
pub struct SmtpRelay {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpRelay {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| MailError::Smtp(e.to_string()))?
            .port(config.port)
            .pool_config(PoolConfig::new().max_size(config.pool_max_size));

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
        })
    }

    fn build_email(message: &MailMessage) -> Result<Message, MailError> {
        let from: Mailbox = message
            .from
            .parse()
            .map_err(|e| MailError::Smtp(format!("bad from address: {}", e)))?;
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| MailError::Smtp(format!("bad to address: {}", e)))?;

        let mut builder = Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.as_str());

        if let Some(reply_to) = &message.reply_to {
            let mailbox: Mailbox = reply_to
                .parse()
                .map_err(|e| MailError::Smtp(format!("bad reply-to address: {}", e)))?;
            builder = builder.reply_to(mailbox);
        }

        builder
            .header(ContentType::TEXT_HTML)
            .body(message.html.clone())
            .map_err(|e| MailError::Smtp(e.to_string()))
    }
}

#[async_trait]
impl MailTransport for SmtpRelay {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let email = Self::build_email(message)?;
        self.mailer
            .send(email)
            .await
            .map(|_| ())
            .map_err(|e| MailError::Smtp(e.to_string()))
    }
}
