//! Primary provider: transactional email over HTTP.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{MailError, MailMessage, MailTransport};

/// HTTP transactional-email provider. The reqwest client is shared and
/// connection-reusing; it is constructed once per process.
pub struct HttpApiTransport {
    client: Client,
    api_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

impl HttpApiTransport {
    pub fn new(client: Client, api_url: String, api_key: String) -> Self {
        Self {
            client,
            api_url,
            api_key,
        }
    }
}

#[async_trait]
impl MailTransport for HttpApiTransport {
    fn name(&self) -> &'static str {
        "http-api"
    }

    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let payload = SendRequest {
            from: &message.from,
            to: &message.to,
            subject: &message.subject,
            html: &message.html,
            reply_to: message.reply_to.as_deref(),
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MailError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(provider = self.name(), "Mail accepted");
            Ok(())
        } else {
            // The body may carry provider diagnostics; log it, never
            // surface it.
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                provider = self.name(),
                status = status.as_u16(),
                body = %body,
                "Provider rejected message"
            );
            Err(MailError::Status(status.as_u16()))
        }
    }
}
