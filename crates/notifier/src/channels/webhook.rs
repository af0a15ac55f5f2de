//! Webhook channel: POSTs rendered payloads to user configured endpoints.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderValue};

use hub_common::types::Webhook;

use crate::error::DeliveryError;

/// Content type sent when the webhook does not override it.
pub const DEFAULT_PAYLOAD_CONTENT_TYPE: &str = "application/cloudevents+json";

/// Header carrying the webhook's shared secret, so receivers can verify the
/// request came from us.
pub const SECRET_HEADER: &str = "X-ArtifactHub-Secret";

/// Delivers webhook notifications over HTTP.
#[derive(Clone)]
pub struct WebhookChannel {
    client: Client,
}

impl WebhookChannel {
    /// Build a channel whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// POST `payload` to the webhook URL.
    ///
    /// Transport failures and responses with a status >= 400 are errors;
    /// [`DeliveryError::disposition`] decides whether they are retried. The
    /// response body is never read, dropping the response releases the
    /// connection.
    pub async fn deliver(&self, webhook: &Webhook, payload: String) -> Result<(), DeliveryError> {
        let url = reqwest::Url::parse(&webhook.url)
            .map_err(|e| DeliveryError::InvalidWebhook(format!("url '{}': {}", webhook.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DeliveryError::InvalidWebhook(format!(
                "url '{}': unsupported scheme '{}'",
                webhook.url,
                url.scheme()
            )));
        }

        let content_type = webhook
            .content_type
            .as_deref()
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_PAYLOAD_CONTENT_TYPE);
        let content_type = HeaderValue::from_str(content_type)
            .map_err(|e| DeliveryError::InvalidWebhook(format!("content type: {}", e)))?;
        let secret = HeaderValue::from_str(&webhook.secret)
            .map_err(|e| DeliveryError::InvalidWebhook(format!("secret: {}", e)))?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .header(SECRET_HEADER, secret)
            .body(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    DeliveryError::InvalidWebhook(e.to_string())
                } else {
                    DeliveryError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        drop(response);

        if status.as_u16() >= 400 {
            return Err(DeliveryError::UnexpectedStatus(status.as_u16()));
        }

        tracing::debug!(webhook_id = %webhook.webhook_id, status = status.as_u16(), "Webhook delivered");
        Ok(())
    }
}
