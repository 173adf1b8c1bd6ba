//! Inbound vendor webhooks.
//!
//! Every delivery goes through the same steps: authenticate the raw body,
//! classify the event, and turn recognised failures into a `high` alert.
//! Anything else is logged and dropped.

mod github;
mod gitlab;
mod jenkins;

use axum::http::HeaderMap;
use log::info;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::alerts::{Alert, AlertStore, NewAlert, Severity};
use crate::error::{DashboardError, Result};
use crate::providers::Vendor;

/// Shared secrets configured for webhook authentication.
#[derive(Debug, Clone, Default)]
pub struct WebhookSecrets {
    pub github: Option<String>,
    pub gitlab: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookReceipt {
    pub vendor: Vendor,
    pub event: String,
    /// Alert raised for the delivery, if it reported a failure
    pub alert: Option<Alert>,
}

/// A failure reported by a webhook, before it becomes an alert.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Failure {
    pub title: String,
    pub message: String,
    pub pipeline_id: Option<String>,
    pub url: Option<String>,
}

/// Authenticates, classifies and handles one delivery.
///
/// # Errors
///
/// `Unauthorized` when the signature or token does not match, `Config` when
/// the vendor's secret is not configured, `InvalidPayload` for a body that is
/// not a JSON object.
pub fn ingest(
    vendor: Vendor,
    headers: &HeaderMap,
    body: &[u8],
    secrets: &WebhookSecrets,
    store: &mut AlertStore,
) -> Result<WebhookReceipt> {
    match vendor {
        Vendor::GitHub => github::verify(headers, body, secrets.github.as_deref())?,
        Vendor::GitLab => gitlab::verify(headers, secrets.gitlab.as_deref())?,
        Vendor::Jenkins => {}
    }

    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| DashboardError::InvalidPayload(format!("webhook body is not JSON: {e}")))?;
    if !payload.is_object() {
        return Err(DashboardError::InvalidPayload(
            "webhook body must be a JSON object".to_string(),
        ));
    }

    let (event, failure) = match vendor {
        Vendor::GitHub => {
            let kind = github::classify(headers);
            (kind.to_string(), github::failure(&kind, &payload))
        }
        Vendor::GitLab => {
            let kind = gitlab::classify(headers);
            (kind.to_string(), gitlab::failure(&kind, &payload))
        }
        Vendor::Jenkins => {
            let kind = jenkins::classify(&payload);
            (kind.to_string(), jenkins::failure(&kind, &payload))
        }
    };

    let alert = match failure {
        Some(failure) => Some(store.create(failure_alert(vendor, &event, failure))?),
        None => {
            info!("Ignoring {vendor} webhook event '{event}'");
            None
        }
    };

    Ok(WebhookReceipt {
        vendor,
        event,
        alert,
    })
}

fn failure_alert(vendor: Vendor, event: &str, failure: Failure) -> NewAlert {
    let mut metadata = Map::new();
    metadata.insert("event".to_string(), Value::String(event.to_string()));
    if let Some(url) = failure.url {
        metadata.insert("url".to_string(), Value::String(url));
    }

    NewAlert {
        category: "build".to_string(),
        source: vendor.to_string(),
        pipeline_id: failure.pipeline_id,
        metadata,
        ..NewAlert::new(failure.title, failure.message, Severity::High)
    }
}

/// Header value as text, or `None` when absent or not visible ASCII.
fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn text<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::HeaderValue;

    use super::*;
    use crate::alerts::LogNotifier;

    fn store() -> AlertStore {
        AlertStore::new(Arc::new(LogNotifier))
    }

    #[test]
    fn jenkins_failure_creates_high_alert() {
        let mut store = store();
        let body = br#"{"name": "api-server", "build": {"number": 12, "status": "FAILURE", "full_url": "https://ci/job/api-server/12/"}}"#;

        let receipt = ingest(
            Vendor::Jenkins,
            &HeaderMap::new(),
            body,
            &WebhookSecrets::default(),
            &mut store,
        )
        .unwrap();

        let alert = receipt.alert.unwrap();
        assert_eq!(receipt.event, "build");
        assert_eq!(alert.severity, Severity::High);
        assert_eq!(alert.source, "jenkins");
        assert_eq!(alert.pipeline_id.as_deref(), Some("jenkins:api-server:12"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn successful_build_is_dropped() {
        let mut store = store();
        let body = br#"{"name": "api-server", "build": {"number": 13, "status": "SUCCESS"}}"#;

        let receipt = ingest(
            Vendor::Jenkins,
            &HeaderMap::new(),
            body,
            &WebhookSecrets::default(),
            &mut store,
        )
        .unwrap();

        assert!(receipt.alert.is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn non_object_body_is_invalid() {
        let mut store = store();
        let err = ingest(
            Vendor::Jenkins,
            &HeaderMap::new(),
            b"[1, 2]",
            &WebhookSecrets::default(),
            &mut store,
        )
        .unwrap_err();

        assert!(matches!(err, DashboardError::InvalidPayload(_)));
    }

    #[test]
    fn gitlab_token_is_checked_before_the_payload() {
        let mut store = store();
        let mut headers = HeaderMap::new();
        headers.insert("x-gitlab-token", HeaderValue::from_static("wrong"));
        headers.insert("x-gitlab-event", HeaderValue::from_static("Pipeline Hook"));
        let secrets = WebhookSecrets {
            github: None,
            gitlab: Some("shared".to_string()),
        };

        let err = ingest(Vendor::GitLab, &headers, b"not json", &secrets, &mut store).unwrap_err();

        assert!(matches!(err, DashboardError::Unauthorized(_)));
        assert_eq!(store.len(), 0);
    }
}
