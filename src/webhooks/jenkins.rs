use std::fmt;

use serde_json::Value;

use super::{text, Failure};
use crate::reference::PipelineRef;

/// Jenkins notifications carry no event header; the payload shape decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum JenkinsEvent {
    Build,
    Job,
    Unknown,
}

impl fmt::Display for JenkinsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JenkinsEvent::Build => "build",
            JenkinsEvent::Job => "job",
            JenkinsEvent::Unknown => "unknown",
        })
    }
}

pub(super) fn classify(payload: &Value) -> JenkinsEvent {
    if payload.get("build").is_some() {
        JenkinsEvent::Build
    } else if payload.get("job").is_some() {
        JenkinsEvent::Job
    } else {
        JenkinsEvent::Unknown
    }
}

pub(super) fn failure(kind: &JenkinsEvent, payload: &Value) -> Option<Failure> {
    if *kind != JenkinsEvent::Build || text(payload, "/build/status") != Some("FAILURE") {
        return None;
    }

    let job = text(payload, "/name").or_else(|| text(payload, "/job/name"));
    let number = payload.pointer("/build/number").and_then(Value::as_u64);

    let pipeline_id = job.and_then(|job| {
        let pipeline = PipelineRef::parse(&format!("jenkins:{job}")).ok()?;
        Some(match number {
            Some(number) => pipeline.build(number).to_string(),
            None => pipeline.to_string(),
        })
    });

    let job = job.unwrap_or("unknown job");
    Some(Failure {
        title: format!("Jenkins build failed: {job}"),
        message: match number {
            Some(number) => format!("Build #{number} of {job} finished with FAILURE"),
            None => format!("A build of {job} finished with FAILURE"),
        },
        pipeline_id,
        url: text(payload, "/build/full_url").map(ToString::to_string),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn payload_shape_decides_event() {
        assert_eq!(classify(&json!({"build": {}})), JenkinsEvent::Build);
        assert_eq!(classify(&json!({"job": {"name": "x"}})), JenkinsEvent::Job);
        assert_eq!(classify(&json!({"other": 1})), JenkinsEvent::Unknown);
    }

    #[test]
    fn failed_build_names_job_and_number() {
        let payload = json!({"name": "api-server", "build": {"number": 12, "status": "FAILURE"}});

        let failure = failure(&JenkinsEvent::Build, &payload).unwrap();

        assert_eq!(failure.title, "Jenkins build failed: api-server");
        assert_eq!(failure.message, "Build #12 of api-server finished with FAILURE");
        assert_eq!(failure.pipeline_id.as_deref(), Some("jenkins:api-server:12"));
    }

    #[test]
    fn unstable_and_job_events_are_ignored() {
        let unstable = json!({"name": "api", "build": {"number": 3, "status": "UNSTABLE"}});
        assert!(failure(&JenkinsEvent::Build, &unstable).is_none());

        let job = json!({"job": {"name": "api"}, "status": "FAILURE"});
        assert!(failure(&classify(&job), &job).is_none());
    }
}
