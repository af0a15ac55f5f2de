//! Email channel backed by the Resend HTTP API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{EmailData, EmailSender};
use crate::error::DeliveryError;

/// Sends emails when a provider is configured.
///
/// Without one every delivery fails with
/// [`DeliveryError::SenderNotAvailable`], which is terminal: retrying can
/// never succeed until the process is reconfigured.
#[derive(Clone, Default)]
pub struct EmailChannel {
    sender: Option<Arc<dyn EmailSender>>,
}

impl EmailChannel {
    pub fn new(sender: Option<Arc<dyn EmailSender>>) -> Self {
        Self { sender }
    }

    pub fn is_configured(&self) -> bool {
        self.sender.is_some()
    }

    pub async fn send(&self, data: &EmailData) -> Result<(), DeliveryError> {
        match &self.sender {
            Some(sender) => sender.send_email(data).await,
            None => Err(DeliveryError::SenderNotAvailable),
        }
    }
}

/// [`EmailSender`] using Resend (`POST /emails`).
pub struct ResendSender {
    client: Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl ResendSender {
    const DEFAULT_ENDPOINT: &'static str = "https://api.resend.com/emails";

    pub fn new(api_key: String, from: String, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            api_key,
            from,
        })
    }

    /// Point the sender at a different API endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl EmailSender for ResendSender {
    async fn send_email(&self, data: &EmailData) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [data.to],
                "subject": data.subject,
                "html": data.body,
            }))
            .send()
            .await
            .map_err(|e| DeliveryError::EmailUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Err(DeliveryError::EmailUnavailable(format!("{} - {}", status, body)))
        } else {
            Err(DeliveryError::EmailRejected(format!("{} - {}", status, body)))
        }
    }
}
