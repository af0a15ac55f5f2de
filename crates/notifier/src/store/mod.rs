//! Backing store contracts.
//!
//! The worker needs three things from the database:
//! - a transactional queue it can claim pending notifications from
//!   ([`NotificationStore`] / [`QueueTransaction`])
//! - read access to packages ([`PackageReader`])
//! - read access to repositories ([`RepositoryReader`])

mod postgres;

pub use postgres::{PgCatalog, PgNotificationStore};

use async_trait::async_trait;
use uuid::Uuid;

use hub_common::error::AppError;
use hub_common::types::{Notification, Package, Repository};

/// Opens dequeue transactions.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn QueueTransaction>, AppError>;

    /// Move an unprocessed notification behind every row not attempted since,
    /// after a retryable failure. Runs outside any dequeue transaction and
    /// leaves `processed` and `error` untouched. A row currently claimed by
    /// another transaction is left as is.
    async fn mark_attempted(&self, notification_id: Uuid) -> Result<(), AppError>;
}

/// One open transaction against the notification queue.
///
/// Dropping a transaction without calling [`QueueTransaction::commit`] rolls
/// it back and releases any row it claimed.
#[async_trait]
pub trait QueueTransaction: Send {
    /// Claim the next unprocessed notification: never attempted rows first,
    /// oldest first, then rows by least recent retryable attempt.
    ///
    /// Rows claimed by other open transactions are skipped, never waited on.
    /// Returns `Ok(None)` when nothing is claimable.
    async fn get_pending(&mut self) -> Result<Option<Notification>, AppError>;

    /// Record the outcome of a claimed notification. `error` is `None` on
    /// success.
    async fn update_status(
        &mut self,
        notification_id: Uuid,
        processed: bool,
        error: Option<&str>,
    ) -> Result<(), AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;

    /// Roll back now, releasing the claimed row before returning.
    async fn rollback(self: Box<Self>) -> Result<(), AppError>;
}

#[async_trait]
pub trait PackageReader: Send + Sync {
    async fn get_package(&self, package_id: Uuid, version: &str) -> Result<Package, AppError>;
}

#[async_trait]
pub trait RepositoryReader: Send + Sync {
    async fn get_repository(&self, repository_id: Uuid) -> Result<Repository, AppError>;
}
