use std::fmt;

use axum::http::HeaderMap;
use log::warn;
use serde_json::Value;

use super::{header, text, Failure};
use crate::error::{DashboardError, Result};
use crate::reference::PipelineRef;

pub const TOKEN_HEADER: &str = "x-gitlab-token";
pub const EVENT_HEADER: &str = "x-gitlab-event";

/// GitLab sends the configured secret verbatim in `X-Gitlab-Token`.
pub(super) fn verify(headers: &HeaderMap, secret: Option<&str>) -> Result<()> {
    let secret = secret.ok_or_else(|| {
        DashboardError::Config("GitLab webhook secret is not configured".to_string())
    })?;

    match header(headers, TOKEN_HEADER) {
        Some(token) if token == secret => Ok(()),
        Some(_) => {
            warn!("Rejected GitLab webhook with invalid token");
            Err(DashboardError::Unauthorized(
                "invalid webhook token".to_string(),
            ))
        }
        None => Err(DashboardError::Unauthorized(
            "missing X-Gitlab-Token".to_string(),
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum GitLabEvent {
    Pipeline,
    Job,
    Push,
    Other(String),
}

impl fmt::Display for GitLabEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitLabEvent::Pipeline => f.write_str("Pipeline Hook"),
            GitLabEvent::Job => f.write_str("Job Hook"),
            GitLabEvent::Push => f.write_str("Push Hook"),
            GitLabEvent::Other(name) => f.write_str(name),
        }
    }
}

pub(super) fn classify(headers: &HeaderMap) -> GitLabEvent {
    match header(headers, EVENT_HEADER) {
        Some("Pipeline Hook") => GitLabEvent::Pipeline,
        Some("Job Hook") => GitLabEvent::Job,
        Some("Push Hook") => GitLabEvent::Push,
        Some(other) => GitLabEvent::Other(other.to_string()),
        None => GitLabEvent::Other("unknown".to_string()),
    }
}

/// Pipeline status from a pipeline hook. GitLab puts it under
/// `object_attributes`; a bare `pipeline` object is accepted too.
fn pipeline_status(payload: &Value) -> Option<&str> {
    text(payload, "/object_attributes/status").or_else(|| text(payload, "/pipeline/status"))
}

pub(super) fn failure(kind: &GitLabEvent, payload: &Value) -> Option<Failure> {
    if *kind != GitLabEvent::Pipeline || pipeline_status(payload) != Some("failed") {
        return None;
    }

    let project = text(payload, "/project/path_with_namespace").unwrap_or("unknown project");
    let branch = text(payload, "/object_attributes/ref").unwrap_or("unknown ref");
    let project_id = payload.pointer("/project/id").and_then(Value::as_u64);
    let pipeline_id = payload
        .pointer("/object_attributes/id")
        .or_else(|| payload.pointer("/pipeline/id"))
        .and_then(Value::as_u64);

    let reference = project_id
        .zip(pipeline_id)
        .map(|(project_id, pipeline_id)| {
            PipelineRef::GitLab {
                project_id,
                pipeline_id,
            }
            .to_string()
        });

    Some(Failure {
        title: format!("GitLab pipeline failed: {project}"),
        message: format!(
            "Pipeline #{} for {project} failed on {branch}",
            pipeline_id.map_or_else(|| "?".to_string(), |id| id.to_string())
        ),
        pipeline_id: reference,
        url: text(payload, "/object_attributes/url").map(ToString::to_string),
    })
}
