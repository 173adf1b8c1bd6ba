use std::fmt;

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use log::warn;
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::{header, text, Failure};
use crate::error::{DashboardError, Result};
use crate::reference::PipelineRef;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const EVENT_HEADER: &str = "x-github-event";

/// Checks `X-Hub-Signature-256` against the HMAC-SHA256 of the raw body.
pub(super) fn verify(headers: &HeaderMap, body: &[u8], secret: Option<&str>) -> Result<()> {
    let secret = secret.ok_or_else(|| {
        DashboardError::Config("GitHub webhook secret is not configured".to_string())
    })?;

    let signature = header(headers, SIGNATURE_HEADER)
        .ok_or_else(|| DashboardError::Unauthorized("missing X-Hub-Signature-256".to_string()))?;

    if signature_matches(body, signature, secret) {
        Ok(())
    } else {
        warn!("Rejected GitHub webhook with invalid signature");
        Err(DashboardError::Unauthorized(
            "invalid webhook signature".to_string(),
        ))
    }
}

/// Constant-time comparison of a `sha256=<hex>` signature.
pub fn signature_matches(body: &[u8], signature: &str, secret: &str) -> bool {
    let Some(hex_digest) = signature.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    computed.as_slice().ct_eq(&expected).into()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum GitHubEvent {
    WorkflowRun,
    WorkflowJob,
    Push,
    Ping,
    Other(String),
}

impl fmt::Display for GitHubEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitHubEvent::WorkflowRun => f.write_str("workflow_run"),
            GitHubEvent::WorkflowJob => f.write_str("workflow_job"),
            GitHubEvent::Push => f.write_str("push"),
            GitHubEvent::Ping => f.write_str("ping"),
            GitHubEvent::Other(name) => f.write_str(name),
        }
    }
}

pub(super) fn classify(headers: &HeaderMap) -> GitHubEvent {
    match header(headers, EVENT_HEADER) {
        Some("workflow_run") => GitHubEvent::WorkflowRun,
        Some("workflow_job") => GitHubEvent::WorkflowJob,
        Some("push") => GitHubEvent::Push,
        Some("ping") => GitHubEvent::Ping,
        Some(other) => GitHubEvent::Other(other.to_string()),
        None => GitHubEvent::Other("unknown".to_string()),
    }
}

pub(super) fn failure(kind: &GitHubEvent, payload: &Value) -> Option<Failure> {
    if *kind != GitHubEvent::WorkflowRun
        || text(payload, "/workflow_run/conclusion") != Some("failure")
    {
        return None;
    }

    let name = text(payload, "/workflow_run/name").unwrap_or("workflow");
    let repository = text(payload, "/repository/full_name");
    let branch = text(payload, "/workflow_run/head_branch").unwrap_or("unknown branch");
    let run_id = payload.pointer("/workflow_run/id").and_then(Value::as_u64);

    let pipeline_id = repository
        .zip(run_id)
        .and_then(|(repo, id)| PipelineRef::parse(&format!("github:{repo}:{id}")).ok())
        .map(|r| r.to_string());

    Some(Failure {
        title: format!("GitHub workflow failed: {name}"),
        message: format!(
            "Workflow '{name}' in {} failed on {branch}",
            repository.unwrap_or("unknown repository")
        ),
        pipeline_id,
        url: text(payload, "/workflow_run/html_url").map(ToString::to_string),
    })
}
