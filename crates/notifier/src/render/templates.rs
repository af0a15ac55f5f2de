//! Built-in templates.

use crate::template::{Template, TemplateError};

/// CloudEvents envelope sent to webhooks without a custom template.
pub const DEFAULT_PACKAGE_WEBHOOK_PAYLOAD: &str = r#"{
	"specversion" : "1.0",
	"id" : {{ json .Event.id }},
	"source" : "{{ .BaseURL }}/cloudevents",
	"type" : "io.artifacthub.{{ .Event.kind }}",
	"datacontenttype" : "application/json",
	"data" : {
		"package": {
			"name": {{ json .Package.name }},
			"version": {{ json .Package.version }},
			"url": {{ json .Package.url }},
			"changes": [{{ list .Package.changes }}],
			"containsSecurityUpdates": {{ .Package.containsSecurityUpdates }},
			"prerelease": {{ .Package.prerelease }},
			"repository": {
				"kind": {{ json .Package.repository.kind }},
				"name": {{ json .Package.repository.name }},
				"publisher": {{ json .Package.repository.publisher }}
			}
		}
	}
}
"#;

/// Repository events get the same envelope with a repository payload.
pub const DEFAULT_REPOSITORY_WEBHOOK_PAYLOAD: &str = r#"{
	"specversion" : "1.0",
	"id" : {{ json .Event.id }},
	"source" : "{{ .BaseURL }}/cloudevents",
	"type" : "io.artifacthub.{{ .Event.kind }}",
	"datacontenttype" : "application/json",
	"data" : {
		"repository": {
			"kind": {{ json .Repository.kind }},
			"name": {{ json .Repository.name }},
			"publisher": {{ json .Repository.publisher }},
			"lastScanningErrors": [{{ list .Repository.lastScanningErrors }}],
			"lastTrackingErrors": [{{ list .Repository.lastTrackingErrors }}]
		}
	}
}
"#;

const NEW_RELEASE_EMAIL: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #38383f;">
<h2>{{ html .Package.name }} {{ html .Package.version }} released</h2>
<p>
  A new version of <b>{{ html .Package.name }}</b> has been published in the
  {{ html .Package.repository.kind }} repository <b>{{ html .Package.repository.name }}</b>
  ({{ html .Package.repository.publisher }}).
</p>
<p><a href="{{ html .Package.url }}">View {{ html .Package.name }} {{ html .Package.version }}</a></p>
<p>Changes in this version:</p>
<pre>{{ html .Package.changes }}</pre>
<p style="font-size: small;">
  You are receiving this email because you subscribed to new releases of this package.
  Manage your subscriptions from the <a href="{{ html .BaseURL }}/control-panel/settings/notifications">control panel</a>.
</p>
</body>
</html>
"#;

const SCANNING_ERRORS_EMAIL: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #38383f;">
<h2>Something went wrong scanning repository {{ html .Repository.name }}</h2>
<p>
  Some errors were found while scanning the security vulnerabilities of the
  packages in the {{ html .Repository.kind }} repository <b>{{ html .Repository.name }}</b>:
</p>
<pre>{{ html .Repository.lastScanningErrors }}</pre>
<p><a href="{{ html .BaseURL }}/control-panel/repositories">Review your repositories</a></p>
</body>
</html>
"#;

const TRACKING_ERRORS_EMAIL: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #38383f;">
<h2>Something went wrong tracking repository {{ html .Repository.name }}</h2>
<p>
  Some errors were found while processing the last changes of the
  {{ html .Repository.kind }} repository <b>{{ html .Repository.name }}</b>:
</p>
<pre>{{ html .Repository.lastTrackingErrors }}</pre>
<p><a href="{{ html .BaseURL }}/control-panel/repositories">Review your repositories</a></p>
</body>
</html>
"#;

const OWNERSHIP_CLAIM_EMAIL: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #38383f;">
<h2>{{ html .Repository.name }} repository ownership has been claimed</h2>
<p>
  The ownership of the {{ html .Repository.kind }} repository <b>{{ html .Repository.name }}</b>
  has been claimed by another user or organization. It is no longer listed in your
  control panel.
</p>
<p>If you did not expect this, please contact us from <a href="{{ html .BaseURL }}">{{ html .BaseURL }}</a>.</p>
</body>
</html>
"#;

/// All built-in templates, parsed once.
#[derive(Debug, Clone)]
pub struct BuiltinTemplates {
    pub package_webhook: Template,
    pub repository_webhook: Template,
    pub new_release_email: Template,
    pub scanning_errors_email: Template,
    pub tracking_errors_email: Template,
    pub ownership_claim_email: Template,
}

impl BuiltinTemplates {
    pub fn parse() -> Result<Self, TemplateError> {
        Ok(Self {
            package_webhook: Template::parse(DEFAULT_PACKAGE_WEBHOOK_PAYLOAD)?,
            repository_webhook: Template::parse(DEFAULT_REPOSITORY_WEBHOOK_PAYLOAD)?,
            new_release_email: Template::parse(NEW_RELEASE_EMAIL)?,
            scanning_errors_email: Template::parse(SCANNING_ERRORS_EMAIL)?,
            tracking_errors_email: Template::parse(TRACKING_ERRORS_EMAIL)?,
            ownership_claim_email: Template::parse(OWNERSHIP_CLAIM_EMAIL)?,
        })
    }
}
