//! Delivery channels.
//!
//! - Email, through an [`EmailSender`] provider (users)
//! - Webhooks, as an HTTP POST carrying the webhook secret (webhook targets)

mod email;
mod webhook;

pub use email::{EmailChannel, ResendSender};
pub use webhook::{DEFAULT_PAYLOAD_CONTENT_TYPE, SECRET_HEADER, WebhookChannel};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DeliveryError;

/// A rendered email ready to be sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailData {
    pub to: String,
    pub subject: String,
    /// HTML body.
    pub body: String,
}

/// Email provider contract.
///
/// Implementations classify their own failures: a provider that is
/// temporarily unreachable returns [`DeliveryError::EmailUnavailable`], one
/// that refuses the message returns [`DeliveryError::EmailRejected`].
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, data: &EmailData) -> Result<(), DeliveryError>;
}
