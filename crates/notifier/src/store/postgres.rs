//! PostgreSQL implementation of the store contracts.
//!
//! Claiming uses `SELECT ... FOR UPDATE SKIP LOCKED` inside the dequeue
//! transaction: concurrent workers each lock a different row, and the lock is
//! held until the outcome is committed or the transaction is rolled back.
//! Rows that failed retryably carry `last_attempt_at` and queue behind the
//! ones never attempted.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use hub_common::error::AppError;
use hub_common::types::{
    Event, EventKind, Notification, NotificationTarget, Package, Repository, RepositoryKind, User,
    Webhook,
};

use super::{NotificationStore, PackageReader, QueueTransaction, RepositoryReader};

/// Notification queue stored in the `notification` table.
#[derive(Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn begin(&self) -> Result<Box<dyn QueueTransaction>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgQueueTransaction { tx }))
    }

    async fn mark_attempted(&self, notification_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE notification
            SET last_attempt_at = NOW()
            WHERE notification_id = (
                SELECT notification_id
                FROM notification
                WHERE notification_id = $1 AND processed = FALSE
                FOR UPDATE SKIP LOCKED
            )
            "#,
        )
        .bind(notification_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Open dequeue transaction. sqlx rolls it back on drop.
pub struct PgQueueTransaction {
    tx: Transaction<'static, Postgres>,
}

#[derive(Debug, sqlx::FromRow)]
struct PendingRow {
    notification_id: Uuid,
    event_id: Uuid,
    event_kind_id: i32,
    package_id: Option<Uuid>,
    package_version: Option<String>,
    repository_id: Option<Uuid>,
    user_id: Option<Uuid>,
    email: Option<String>,
    webhook_id: Option<Uuid>,
    url: Option<String>,
    secret: Option<String>,
    content_type: Option<String>,
    template: Option<String>,
}

impl PendingRow {
    /// Convert into a notification, or explain why the row is undeliverable.
    fn into_notification(self) -> Result<Notification, String> {
        let kind = EventKind::from_parts(
            self.event_kind_id,
            self.package_id,
            self.package_version,
            self.repository_id,
        )
        .ok_or_else(|| {
            format!(
                "unsupported event kind {} or missing event references",
                self.event_kind_id
            )
        })?;

        let target = match (self.user_id, self.email, self.webhook_id, self.url) {
            (Some(user_id), Some(email), None, _) => NotificationTarget::User(User { user_id, email }),
            (None, _, Some(webhook_id), Some(url)) => NotificationTarget::Webhook(Webhook {
                webhook_id,
                url,
                secret: self.secret.unwrap_or_default(),
                content_type: self.content_type,
                template: self.template,
            }),
            _ => return Err("notification must target exactly one user or webhook".to_string()),
        };

        Ok(Notification {
            notification_id: self.notification_id,
            event: Event {
                event_id: self.event_id,
                kind,
            },
            target,
        })
    }
}

#[async_trait]
impl QueueTransaction for PgQueueTransaction {
    async fn get_pending(&mut self) -> Result<Option<Notification>, AppError> {
        loop {
            let row: Option<PendingRow> = sqlx::query_as(
                r#"
                SELECT
                    n.notification_id,
                    e.event_id,
                    e.event_kind_id,
                    e.package_id,
                    e.package_version,
                    e.repository_id,
                    u.user_id,
                    u.email,
                    w.webhook_id,
                    w.url,
                    w.secret,
                    w.content_type,
                    w.template
                FROM notification n
                JOIN event e ON e.event_id = n.event_id
                LEFT JOIN "user" u ON u.user_id = n.user_id
                LEFT JOIN webhook w ON w.webhook_id = n.webhook_id
                WHERE n.processed = FALSE
                ORDER BY n.last_attempt_at ASC NULLS FIRST, n.created_at ASC
                LIMIT 1
                FOR UPDATE OF n SKIP LOCKED
                "#,
            )
            .fetch_optional(&mut *self.tx)
            .await?;

            let Some(row) = row else {
                return Ok(None);
            };

            let notification_id = row.notification_id;
            match row.into_notification() {
                Ok(notification) => return Ok(Some(notification)),
                Err(reason) => {
                    // Undeliverable rows would otherwise block the head of the queue
                    tracing::warn!(
                        notification_id = %notification_id,
                        reason = %reason,
                        "Discarding undeliverable notification"
                    );
                    self.update_status(notification_id, true, Some(&reason))
                        .await?;
                }
            }
        }
    }

    async fn update_status(
        &mut self,
        notification_id: Uuid,
        processed: bool,
        error: Option<&str>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE notification
            SET processed = $2,
                processed_at = CASE WHEN $2 THEN NOW() END,
                error = $3
            WHERE notification_id = $1
            "#,
        )
        .bind(notification_id)
        .bind(processed)
        .bind(error)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Notification {} not found",
                notification_id
            )));
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Package and repository lookups.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RepositoryRow {
    repository_id: Uuid,
    repository_name: String,
    repository_kind_id: i32,
    user_alias: Option<String>,
    organization_name: Option<String>,
    last_scanning_errors: Option<String>,
    last_tracking_errors: Option<String>,
}

impl TryFrom<RepositoryRow> for Repository {
    type Error = AppError;

    fn try_from(row: RepositoryRow) -> Result<Self, Self::Error> {
        let kind = RepositoryKind::from_id(row.repository_kind_id).ok_or_else(|| {
            AppError::Internal(format!(
                "Repository {} has unknown kind {}",
                row.repository_id, row.repository_kind_id
            ))
        })?;

        Ok(Repository {
            repository_id: row.repository_id,
            name: row.repository_name,
            kind,
            user_alias: row.user_alias,
            organization_name: row.organization_name,
            last_scanning_errors: row.last_scanning_errors,
            last_tracking_errors: row.last_tracking_errors,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PackageRow {
    package_id: Uuid,
    name: String,
    normalized_name: String,
    logo_image_id: Option<String>,
    version: String,
    changes: Vec<String>,
    contains_security_updates: bool,
    prerelease: bool,
    #[sqlx(flatten)]
    repository: RepositoryRow,
}

const REPOSITORY_COLUMNS: &str = r#"
    r.repository_id,
    r.name AS repository_name,
    r.repository_kind_id,
    u.alias AS user_alias,
    o.name AS organization_name,
    r.last_scanning_errors,
    r.last_tracking_errors
"#;

const REPOSITORY_JOINS: &str = r#"
    LEFT JOIN "user" u ON u.user_id = r.user_id
    LEFT JOIN organization o ON o.organization_id = r.organization_id
"#;

#[async_trait]
impl PackageReader for PgCatalog {
    async fn get_package(&self, package_id: Uuid, version: &str) -> Result<Package, AppError> {
        let query = format!(
            r#"
            SELECT
                p.package_id,
                p.name,
                p.normalized_name,
                p.logo_image_id::text AS logo_image_id,
                s.version,
                s.changes,
                s.contains_security_updates,
                s.prerelease,
                {REPOSITORY_COLUMNS}
            FROM package p
            JOIN snapshot s ON s.package_id = p.package_id
            JOIN repository r ON r.repository_id = p.repository_id
            {REPOSITORY_JOINS}
            WHERE p.package_id = $1 AND s.version = $2
            "#
        );

        let row: PackageRow = sqlx::query_as(&query)
            .bind(package_id)
            .bind(version)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Package {} version {} not found", package_id, version))
            })?;

        Ok(Package {
            package_id: row.package_id,
            name: row.name,
            normalized_name: row.normalized_name,
            version: row.version,
            logo_image_id: row.logo_image_id,
            changes: row.changes,
            contains_security_updates: row.contains_security_updates,
            prerelease: row.prerelease,
            repository: row.repository.try_into()?,
        })
    }
}

#[async_trait]
impl RepositoryReader for PgCatalog {
    async fn get_repository(&self, repository_id: Uuid) -> Result<Repository, AppError> {
        let query = format!(
            r#"
            SELECT {REPOSITORY_COLUMNS}
            FROM repository r
            {REPOSITORY_JOINS}
            WHERE r.repository_id = $1
            "#
        );

        let row: RepositoryRow = sqlx::query_as(&query)
            .bind(repository_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Repository {} not found", repository_id)))?;

        row.try_into()
    }
}
