use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of repositories a package can be published from.
///
/// The numeric ids match the `repository_kind_id` column; names are the
/// path segment used in package URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepositoryKind {
    Helm,
    Falco,
    Opa,
    Olm,
    Tbaction,
    Krew,
    HelmPlugin,
    TektonTask,
    KedaScaler,
    Coredns,
    Keptn,
    TektonPipeline,
    Container,
    Kubewarden,
    Gatekeeper,
    Kyverno,
    KnativeClientPlugin,
    Backstage,
    ArgoTemplate,
    Kubearmor,
    Kcl,
    Headlamp,
    InspektorGadget,
    TektonStepaction,
    Meshery,
    Opencost,
    Radius,
}

impl RepositoryKind {
    /// Resolve a kind from its database id.
    pub fn from_id(id: i32) -> Option<Self> {
        let kind = match id {
            0 => RepositoryKind::Helm,
            1 => RepositoryKind::Falco,
            2 => RepositoryKind::Opa,
            3 => RepositoryKind::Olm,
            4 => RepositoryKind::Tbaction,
            5 => RepositoryKind::Krew,
            6 => RepositoryKind::HelmPlugin,
            7 => RepositoryKind::TektonTask,
            8 => RepositoryKind::KedaScaler,
            9 => RepositoryKind::Coredns,
            10 => RepositoryKind::Keptn,
            11 => RepositoryKind::TektonPipeline,
            12 => RepositoryKind::Container,
            13 => RepositoryKind::Kubewarden,
            14 => RepositoryKind::Gatekeeper,
            15 => RepositoryKind::Kyverno,
            16 => RepositoryKind::KnativeClientPlugin,
            17 => RepositoryKind::Backstage,
            18 => RepositoryKind::ArgoTemplate,
            19 => RepositoryKind::Kubearmor,
            20 => RepositoryKind::Kcl,
            21 => RepositoryKind::Headlamp,
            22 => RepositoryKind::InspektorGadget,
            23 => RepositoryKind::TektonStepaction,
            24 => RepositoryKind::Meshery,
            25 => RepositoryKind::Opencost,
            26 => RepositoryKind::Radius,
            _ => return None,
        };
        Some(kind)
    }

    /// Name used in package URLs and notification payloads.
    pub fn name(&self) -> &'static str {
        match self {
            RepositoryKind::Helm => "helm",
            RepositoryKind::Falco => "falco",
            RepositoryKind::Opa => "opa",
            RepositoryKind::Olm => "olm",
            RepositoryKind::Tbaction => "tbaction",
            RepositoryKind::Krew => "krew",
            RepositoryKind::HelmPlugin => "helm-plugin",
            RepositoryKind::TektonTask => "tekton-task",
            RepositoryKind::KedaScaler => "keda-scaler",
            RepositoryKind::Coredns => "coredns",
            RepositoryKind::Keptn => "keptn",
            RepositoryKind::TektonPipeline => "tekton-pipeline",
            RepositoryKind::Container => "container",
            RepositoryKind::Kubewarden => "kubewarden",
            RepositoryKind::Gatekeeper => "gatekeeper",
            RepositoryKind::Kyverno => "kyverno",
            RepositoryKind::KnativeClientPlugin => "knative-client-plugin",
            RepositoryKind::Backstage => "backstage",
            RepositoryKind::ArgoTemplate => "argo-template",
            RepositoryKind::Kubearmor => "kubearmor",
            RepositoryKind::Kcl => "kcl",
            RepositoryKind::Headlamp => "headlamp",
            RepositoryKind::InspektorGadget => "inspektor-gadget",
            RepositoryKind::TektonStepaction => "tekton-stepaction",
            RepositoryKind::Meshery => "meshery",
            RepositoryKind::Opencost => "opencost",
            RepositoryKind::Radius => "radius",
        }
    }
}

impl std::fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What happened, together with the references needed to describe it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    NewRelease { package_id: Uuid, package_version: String },
    RepositoryTrackingErrors { repository_id: Uuid },
    RepositoryOwnershipClaim { repository_id: Uuid },
    RepositoryScanningErrors { repository_id: Uuid },
}

impl EventKind {
    pub const NEW_RELEASE_ID: i32 = 0;
    pub const REPOSITORY_TRACKING_ERRORS_ID: i32 = 2;
    pub const REPOSITORY_OWNERSHIP_CLAIM_ID: i32 = 3;
    pub const REPOSITORY_SCANNING_ERRORS_ID: i32 = 4;

    /// Build an event kind from its database id and foreign references.
    ///
    /// Returns `None` for ids this worker does not deliver, or when the
    /// references the kind requires are missing.
    pub fn from_parts(
        id: i32,
        package_id: Option<Uuid>,
        package_version: Option<String>,
        repository_id: Option<Uuid>,
    ) -> Option<Self> {
        match id {
            Self::NEW_RELEASE_ID => Some(EventKind::NewRelease {
                package_id: package_id?,
                package_version: package_version?,
            }),
            Self::REPOSITORY_TRACKING_ERRORS_ID => Some(EventKind::RepositoryTrackingErrors {
                repository_id: repository_id?,
            }),
            Self::REPOSITORY_OWNERSHIP_CLAIM_ID => Some(EventKind::RepositoryOwnershipClaim {
                repository_id: repository_id?,
            }),
            Self::REPOSITORY_SCANNING_ERRORS_ID => Some(EventKind::RepositoryScanningErrors {
                repository_id: repository_id?,
            }),
            _ => None,
        }
    }

    /// Kind string exposed to templates, e.g. `package.new-release`.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::NewRelease { .. } => "package.new-release",
            EventKind::RepositoryTrackingErrors { .. } => "repository.tracking-errors",
            EventKind::RepositoryOwnershipClaim { .. } => "repository.ownership-claim",
            EventKind::RepositoryScanningErrors { .. } => "repository.scanning-errors",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable record of a domain occurrence that triggers notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: Uuid,
    pub kind: EventKind,
}

/// A user receiving notifications by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
}

/// A webhook configured to receive notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webhook {
    pub webhook_id: Uuid,
    pub url: String,
    /// Shared secret sent along with every request.
    pub secret: String,
    /// Overrides the default payload content type.
    pub content_type: Option<String>,
    /// Custom payload template; the default CloudEvents envelope when unset.
    pub template: Option<String>,
}

/// Who a notification is delivered to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationTarget {
    User(User),
    Webhook(Webhook),
}

/// One pending delivery obligation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: Uuid,
    pub event: Event,
    pub target: NotificationTarget,
}

/// A repository packages are published from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub repository_id: Uuid,
    pub name: String,
    pub kind: RepositoryKind,
    pub user_alias: Option<String>,
    pub organization_name: Option<String>,
    pub last_scanning_errors: Option<String>,
    pub last_tracking_errors: Option<String>,
}

impl Repository {
    /// Organization name when set, otherwise the owning user's alias.
    pub fn publisher(&self) -> &str {
        self.organization_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.user_alias.as_deref())
            .unwrap_or_default()
    }
}

/// A package snapshot at a given version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub package_id: Uuid,
    pub name: String,
    pub normalized_name: String,
    pub version: String,
    pub logo_image_id: Option<String>,
    pub changes: Vec<String>,
    pub contains_security_updates: bool,
    pub prerelease: bool,
    pub repository: Repository,
}
