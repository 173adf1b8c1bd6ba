use serde::{Deserialize, Serialize};

use crate::providers::BuildStatus;

/// Root `/api/json` document of a Jenkins controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JenkinsRoot {
    pub description: Option<String>,
    pub url: Option<String>,
    pub node_description: Option<String>,
    #[serde(default)]
    pub jobs: Vec<JenkinsJob>,
}

/// A Jenkins job (freestyle, pipeline or folder).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JenkinsJob {
    pub name: String,
    pub url: Option<String>,
    /// Ball color, e.g. "blue", "red", "blue_anime"
    pub color: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub builds: Vec<JenkinsBuild>,
}

/// A single build of a Jenkins job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JenkinsBuild {
    pub number: u64,
    pub url: Option<String>,
    /// Start time in milliseconds since the epoch
    pub timestamp: Option<i64>,
    /// SUCCESS, FAILURE, UNSTABLE, ABORTED, NOT_BUILT, or null while building
    pub result: Option<String>,
    /// Duration in milliseconds, zero while building
    #[serde(default)]
    pub duration: u64,
    pub description: Option<String>,
    pub building: Option<bool>,
    pub full_display_name: Option<String>,
}

impl JenkinsBuild {
    pub fn status(&self) -> Option<BuildStatus> {
        match self.result.as_deref() {
            Some("SUCCESS") => Some(BuildStatus::Success),
            Some("FAILURE") => Some(BuildStatus::Failure),
            Some("UNSTABLE") => Some(BuildStatus::Unstable),
            Some("ABORTED") => Some(BuildStatus::Aborted),
            Some(_) => None,
            None if self.building != Some(false) => Some(BuildStatus::Running),
            None => None,
        }
    }
}
