//! Template data preparation and rendering.
//!
//! Turns an [`Event`] into channel specific output:
//! - [`TemplateRenderer::email_data`] → subject + HTML body
//! - [`TemplateRenderer::webhook_payload`] → request body, from the webhook's
//!   own template or the default CloudEvents envelope
//!
//! Packages, repositories and rendered emails are cached per event, so the
//! backend is queried once per event and cache window no matter how many
//! notifications reference it.

mod templates;

pub use templates::{DEFAULT_PACKAGE_WEBHOOK_PAYLOAD, DEFAULT_REPOSITORY_WEBHOOK_PAYLOAD};

use std::sync::Arc;

use serde_json::{Value, json};
use uuid::Uuid;

use hub_common::types::{Event, EventKind, Package, Repository, Webhook};

use crate::cache::{CacheKey, CachedPayload, PayloadCache};
use crate::channels::EmailData;
use crate::error::DeliveryError;
use crate::store::{PackageReader, RepositoryReader};
use crate::template::{Template, TemplateError};

use templates::BuiltinTemplates;

/// Build the public URL of a package version.
pub fn package_url(base_url: &str, package: &Package, version: &str) -> String {
    let mut url = format!(
        "{}/packages/{}/{}/{}",
        base_url,
        package.repository.kind.name(),
        package.repository.name,
        package.normalized_name
    );
    if !version.is_empty() {
        url.push('/');
        url.push_str(version);
    }
    url
}

/// Renders notification content, caching derived data per event.
pub struct TemplateRenderer {
    base_url: String,
    cache: Arc<dyn PayloadCache>,
    packages: Arc<dyn PackageReader>,
    repositories: Arc<dyn RepositoryReader>,
    templates: BuiltinTemplates,
}

impl TemplateRenderer {
    pub fn new(
        base_url: impl Into<String>,
        cache: Arc<dyn PayloadCache>,
        packages: Arc<dyn PackageReader>,
        repositories: Arc<dyn RepositoryReader>,
    ) -> Result<Self, TemplateError> {
        Ok(Self {
            base_url: base_url.into(),
            cache,
            packages,
            repositories,
            templates: BuiltinTemplates::parse()?,
        })
    }

    /// Subject and body of the email for `event`, without a recipient.
    pub async fn email_data(&self, event: &Event) -> Result<EmailData, DeliveryError> {
        let key = CacheKey::EmailData(event.event_id);
        if let Some(CachedPayload::EmailData(data)) = self.cache.get(&key).await {
            return Ok(data);
        }

        let data = match &event.kind {
            EventKind::NewRelease {
                package_id,
                package_version,
            } => {
                let package = self
                    .package(event.event_id, *package_id, package_version)
                    .await?;
                let tmpl_data = self.package_data(event, &package, package_version);
                EmailData {
                    to: String::new(),
                    subject: format!("{} version {} released", package.name, package.version),
                    body: self.templates.new_release_email.render(&tmpl_data)?,
                }
            }
            EventKind::RepositoryScanningErrors { repository_id } => {
                let repository = self.repository(event.event_id, *repository_id).await?;
                EmailData {
                    to: String::new(),
                    subject: format!(
                        "Something went wrong scanning repository {}",
                        repository.name
                    ),
                    body: self
                        .templates
                        .scanning_errors_email
                        .render(&self.repository_data(event, &repository))?,
                }
            }
            EventKind::RepositoryTrackingErrors { repository_id } => {
                let repository = self.repository(event.event_id, *repository_id).await?;
                EmailData {
                    to: String::new(),
                    subject: format!(
                        "Something went wrong tracking repository {}",
                        repository.name
                    ),
                    body: self
                        .templates
                        .tracking_errors_email
                        .render(&self.repository_data(event, &repository))?,
                }
            }
            EventKind::RepositoryOwnershipClaim { repository_id } => {
                let repository = self.repository(event.event_id, *repository_id).await?;
                EmailData {
                    to: String::new(),
                    subject: format!("{} repository ownership has been claimed", repository.name),
                    body: self
                        .templates
                        .ownership_claim_email
                        .render(&self.repository_data(event, &repository))?,
                }
            }
        };

        self.cache
            .set(&key, CachedPayload::EmailData(data.clone()))
            .await;
        Ok(data)
    }

    /// Request body for delivering `event` to `webhook`.
    ///
    /// Custom templates are parsed on every call; the built-in ones once.
    pub async fn webhook_payload(
        &self,
        event: &Event,
        webhook: &Webhook,
    ) -> Result<String, DeliveryError> {
        let data = self.template_data(event).await?;

        let payload = match webhook.template.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(source) => Template::parse(source)?.render(&data)?,
            None => match event.kind {
                EventKind::NewRelease { .. } => self.templates.package_webhook.render(&data)?,
                _ => self.templates.repository_webhook.render(&data)?,
            },
        };

        Ok(payload)
    }

    /// Data exposed to templates for `event`.
    pub async fn template_data(&self, event: &Event) -> Result<Value, DeliveryError> {
        match &event.kind {
            EventKind::NewRelease {
                package_id,
                package_version,
            } => {
                let package = self
                    .package(event.event_id, *package_id, package_version)
                    .await?;
                Ok(self.package_data(event, &package, package_version))
            }
            EventKind::RepositoryScanningErrors { repository_id }
            | EventKind::RepositoryTrackingErrors { repository_id }
            | EventKind::RepositoryOwnershipClaim { repository_id } => {
                let repository = self.repository(event.event_id, *repository_id).await?;
                Ok(self.repository_data(event, &repository))
            }
        }
    }

    async fn package(
        &self,
        event_id: Uuid,
        package_id: Uuid,
        version: &str,
    ) -> Result<Package, DeliveryError> {
        let key = CacheKey::Package(event_id);
        if let Some(CachedPayload::Package(package)) = self.cache.get(&key).await {
            return Ok(package);
        }

        let package = self
            .packages
            .get_package(package_id, version)
            .await
            .map_err(DeliveryError::PrepareData)?;
        self.cache
            .set(&key, CachedPayload::Package(package.clone()))
            .await;
        Ok(package)
    }

    async fn repository(
        &self,
        event_id: Uuid,
        repository_id: Uuid,
    ) -> Result<Repository, DeliveryError> {
        let key = CacheKey::Repository(event_id);
        if let Some(CachedPayload::Repository(repository)) = self.cache.get(&key).await {
            return Ok(repository);
        }

        let repository = self
            .repositories
            .get_repository(repository_id)
            .await
            .map_err(DeliveryError::PrepareData)?;
        self.cache
            .set(&key, CachedPayload::Repository(repository.clone()))
            .await;
        Ok(repository)
    }

    fn package_data(&self, event: &Event, package: &Package, version: &str) -> Value {
        json!({
            "BaseURL": self.base_url,
            "Event": {
                "id": event.event_id,
                "kind": event.kind.name(),
            },
            "Package": {
                "name": package.name,
                "version": package.version,
                "logoImageID": package.logo_image_id,
                "url": package_url(&self.base_url, package, version),
                "changes": package.changes,
                "containsSecurityUpdates": package.contains_security_updates,
                "prerelease": package.prerelease,
                "repository": {
                    "kind": package.repository.kind.name(),
                    "name": package.repository.name,
                    "publisher": package.repository.publisher(),
                },
            },
        })
    }

    fn repository_data(&self, event: &Event, repository: &Repository) -> Value {
        json!({
            "BaseURL": self.base_url,
            "Event": {
                "id": event.event_id,
                "kind": event.kind.name(),
            },
            "Repository": {
                "kind": repository.kind.name(),
                "name": repository.name,
                "publisher": repository.publisher(),
                "userAlias": repository.user_alias,
                "organizationName": repository.organization_name,
                "lastScanningErrors": error_lines(repository.last_scanning_errors.as_deref()),
                "lastTrackingErrors": error_lines(repository.last_tracking_errors.as_deref()),
            },
        })
    }
}

fn error_lines(errors: Option<&str>) -> Vec<&str> {
    errors
        .unwrap_or_default()
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect()
}
