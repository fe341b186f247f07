//! Resend-compatible HTTP mailer

use super::{EmailMessage, Mailer};
use crate::config::MailConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

#[derive(Deserialize)]
struct SendResponse {
    id: String,
}

/// Sends email through `POST {api_url}/emails` with a bearer API key
#[derive(Clone, Debug)]
pub struct ResendMailer {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl ResendMailer {
    /// Create a mailer from the mail configuration
    pub fn new(config: &MailConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| Error::Config {
            message: "email provider API key is not set".to_string(),
            key: Some("RESEND_API_KEY".to_string()),
        })?;

        let endpoint = Url::parse(&format!("{}/emails", config.api_url.trim_end_matches('/')))
            .map_err(|e| Error::Config {
                message: format!("email API URL '{}' is invalid: {}", config.api_url, e),
                key: Some("RESEND_API_URL".to_string()),
            })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: &EmailMessage) -> Result<String> {
        tracing::debug!(
            to = ?message.to,
            cc = message.cc.len(),
            attachments = message.attachments.len(),
            "Sending email"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Mail(format!(
                "provider responded with status {}: {}",
                status, body
            )));
        }

        let sent: SendResponse = response
            .json()
            .await
            .map_err(|e| Error::Mail(format!("unexpected provider response: {}", e)))?;

        tracing::info!(email_id = %sent.id, subject = %message.subject, "Email sent");
        Ok(sent.id)
    }
}
