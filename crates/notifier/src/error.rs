use thiserror::Error;

use hub_common::error::AppError;

use crate::template::TemplateError;

/// Whether a failed delivery should be attempted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Transient: leave the notification unprocessed so it is claimed again.
    Retryable,
    /// Permanent: mark the notification processed and keep the error text.
    Terminal,
}

/// A failed delivery attempt.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The package or repository backing the event could not be loaded.
    #[error("error preparing template data: {0}")]
    PrepareData(#[source] AppError),

    #[error("error rendering template: {0}")]
    Template(#[from] TemplateError),

    #[error("invalid webhook configuration: {0}")]
    InvalidWebhook(String),

    /// The webhook endpoint could not be reached at all.
    #[error("error calling webhook: {0}")]
    Transport(String),

    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),

    #[error("email sender not available")]
    SenderNotAvailable,

    #[error("email provider unavailable: {0}")]
    EmailUnavailable(String),

    #[error("email rejected: {0}")]
    EmailRejected(String),
}

impl DeliveryError {
    /// Classify the failure.
    pub fn disposition(&self) -> Disposition {
        match self {
            DeliveryError::PrepareData(_)
            | DeliveryError::Transport(_)
            | DeliveryError::EmailUnavailable(_) => Disposition::Retryable,
            // 429 is the receiver asking us to come back later
            DeliveryError::UnexpectedStatus(code) if *code >= 500 || *code == 429 => {
                Disposition::Retryable
            }
            DeliveryError::UnexpectedStatus(_)
            | DeliveryError::Template(_)
            | DeliveryError::InvalidWebhook(_)
            | DeliveryError::SenderNotAvailable
            | DeliveryError::EmailRejected(_) => Disposition::Terminal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.disposition() == Disposition::Retryable
    }
}

/// Reasons a worker iteration did not finish a notification.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Nothing claimable right now. Drives pacing only.
    #[error("no pending notification")]
    NoPending,

    /// Delivery failed transiently; the transaction was rolled back.
    #[error("retryable delivery failure: {0}")]
    Retry(#[source] DeliveryError),

    /// The backing store failed; the transaction did not commit.
    #[error("store error: {0}")]
    Store(#[from] AppError),
}
