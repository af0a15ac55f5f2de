//! Worker loop and dequeue transaction.
//!
//! Each [`Worker`] processes one notification at a time. Several workers, in
//! this process or others, can drain the same queue concurrently: the store
//! hands each of them a different row.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use hub_common::types::{Notification, NotificationTarget};

use crate::channels::{EmailChannel, WebhookChannel};
use crate::error::{DeliveryError, WorkerError};
use crate::render::TemplateRenderer;
use crate::store::NotificationStore;

/// Loop pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Wait after finding nothing to process.
    pub empty_queue_pause: Duration,
    /// Wait after a failed iteration (store failure or retryable delivery
    /// failure).
    pub error_pause: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            empty_queue_pause: Duration::from_secs(30),
            error_pause: Duration::from_secs(10),
        }
    }
}

/// Result of a committed iteration.
#[derive(Debug)]
pub enum Outcome {
    /// Delivered and marked processed.
    Delivered { notification_id: Uuid },
    /// Failed terminally; marked processed with the error text.
    Failed {
        notification_id: Uuid,
        error: DeliveryError,
    },
}

/// Delivers pending notifications until cancelled.
pub struct Worker {
    id: usize,
    store: Arc<dyn NotificationStore>,
    renderer: Arc<TemplateRenderer>,
    email: EmailChannel,
    webhook: WebhookChannel,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        id: usize,
        store: Arc<dyn NotificationStore>,
        renderer: Arc<TemplateRenderer>,
        email: EmailChannel,
        webhook: WebhookChannel,
        config: WorkerConfig,
    ) -> Self {
        Self {
            id,
            store,
            renderer,
            email,
            webhook,
            config,
        }
    }

    /// Process notifications until `cancel` fires.
    ///
    /// Failures are logged and never end the loop. A delivery in flight when
    /// `cancel` fires is allowed to finish; pauses are cut short.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(worker_id = self.id, "Notification worker started");

        while !cancel.is_cancelled() {
            let pause = match self.process_one().await {
                Ok(_) => None,
                Err(WorkerError::NoPending) => Some(self.config.empty_queue_pause),
                Err(WorkerError::Retry(_)) => Some(self.config.error_pause),
                Err(WorkerError::Store(e)) => {
                    tracing::error!(
                        worker_id = self.id,
                        error = %e,
                        "Error processing notification"
                    );
                    Some(self.config.error_pause)
                }
            };

            if let Some(pause) = pause {
                tokio::select! {
                    _ = tokio::time::sleep(pause) => {}
                    _ = cancel.cancelled() => break,
                }
            }
        }

        tracing::info!(worker_id = self.id, "Notification worker stopped");
    }

    /// Claim one pending notification, deliver it and record the outcome, all
    /// in a single transaction.
    ///
    /// - Nothing claimable: [`WorkerError::NoPending`]
    /// - Retryable failure: rolled back, [`WorkerError::Retry`]; the row
    ///   stays unprocessed and is claimed again after the rows queued behind
    ///   it
    /// - Success or terminal failure: marked processed and committed
    pub async fn process_one(&self) -> Result<Outcome, WorkerError> {
        // Dropping `tx` on any early return rolls the transaction back
        let mut tx = self.store.begin().await?;

        let notification = tx.get_pending().await?.ok_or(WorkerError::NoPending)?;
        let notification_id = notification.notification_id;
        let event_id = notification.event.event_id;

        let error = match self.deliver(&notification).await {
            Ok(()) => None,
            Err(e) if e.is_retryable() => {
                tracing::error!(
                    worker_id = self.id,
                    notification_id = %notification_id,
                    event_id = %event_id,
                    error = %e,
                    "Error delivering notification, will retry"
                );

                // The claim must be released before the row is stamped from
                // another connection
                if let Err(store_err) = tx.rollback().await {
                    tracing::error!(
                        worker_id = self.id,
                        notification_id = %notification_id,
                        error = %store_err,
                        "Error rolling back dequeue transaction"
                    );
                } else if let Err(store_err) = self.store.mark_attempted(notification_id).await {
                    tracing::error!(
                        worker_id = self.id,
                        notification_id = %notification_id,
                        event_id = %event_id,
                        error = %store_err,
                        "Error recording delivery attempt"
                    );
                }
                return Err(WorkerError::Retry(e));
            }
            Err(e) => {
                tracing::warn!(
                    worker_id = self.id,
                    notification_id = %notification_id,
                    event_id = %event_id,
                    error = %e,
                    "Notification delivery failed permanently"
                );
                Some(e)
            }
        };

        let message = error.as_ref().map(ToString::to_string);
        if let Err(e) = tx
            .update_status(notification_id, true, message.as_deref())
            .await
        {
            tracing::error!(
                worker_id = self.id,
                notification_id = %notification_id,
                event_id = %event_id,
                error = %e,
                "Error updating notification status"
            );
            return Err(e.into());
        }
        tx.commit().await?;

        Ok(match error {
            None => {
                tracing::debug!(
                    worker_id = self.id,
                    notification_id = %notification_id,
                    event_id = %event_id,
                    channel = channel_name(&notification),
                    "Notification delivered"
                );
                Outcome::Delivered { notification_id }
            }
            Some(error) => Outcome::Failed {
                notification_id,
                error,
            },
        })
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        match &notification.target {
            NotificationTarget::User(user) => {
                // Rendering is pointless when nothing can send the result
                if !self.email.is_configured() {
                    return Err(DeliveryError::SenderNotAvailable);
                }
                let mut data = self.renderer.email_data(&notification.event).await?;
                data.to = user.email.clone();
                self.email.send(&data).await
            }
            NotificationTarget::Webhook(webhook) => {
                let payload = self
                    .renderer
                    .webhook_payload(&notification.event, webhook)
                    .await?;
                self.webhook.deliver(webhook, payload).await
            }
        }
    }
}

fn channel_name(notification: &Notification) -> &'static str {
    match notification.target {
        NotificationTarget::User(_) => "email",
        NotificationTarget::Webhook(_) => "webhook",
    }
}
