use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::providers::BuildStatus;

/// Authenticated user returned by `GET /api/v4/user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabUser {
    pub username: String,
}

/// Project returned by `GET /api/v4/projects`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabProject {
    pub id: u64,
    pub path_with_namespace: String,
    pub web_url: Option<String>,
}

/// A GitLab CI/CD pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabPipeline {
    pub id: u64,
    /// Git reference that triggered the pipeline (e.g., "main", "develop")
    #[serde(rename = "ref")]
    pub ref_: Option<String>,
    /// Pipeline status (e.g., "success", "failed", "running")
    pub status: String,
    /// Trigger source (e.g., "push", "schedule", "web")
    pub source: Option<String>,
    pub web_url: Option<String>,
}

/// A job within a GitLab CI/CD pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabJob {
    pub id: u64,
    /// Job name as defined in .gitlab-ci.yml
    pub name: String,
    /// Stage this job belongs to
    pub stage: Option<String>,
    pub status: String,
    /// Job execution duration in seconds
    pub duration: Option<f64>,
    pub started_at: Option<DateTime<Utc>>,
    pub web_url: Option<String>,
    /// Pipeline the job belongs to
    #[serde(default)]
    pub pipeline: Option<GitLabJobPipeline>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabJobPipeline {
    pub id: u64,
}

impl GitLabJob {
    pub fn build_status(&self) -> Option<BuildStatus> {
        match self.status.as_str() {
            "success" => Some(BuildStatus::Success),
            "failed" => Some(BuildStatus::Failure),
            "canceled" => Some(BuildStatus::Aborted),
            "running" | "pending" | "created" | "preparing" | "waiting_for_resource" => {
                Some(BuildStatus::Running)
            }
            _ => None,
        }
    }

    /// Duration in whole milliseconds.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn duration_ms(&self) -> u64 {
        self.duration
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map_or(0, |secs| (secs * 1000.0).round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(status: &str, duration: Option<f64>) -> GitLabJob {
        GitLabJob {
            id: 1,
            name: "test".to_string(),
            stage: Some("test".to_string()),
            status: status.to_string(),
            duration,
            started_at: None,
            web_url: None,
            pipeline: None,
        }
    }

    #[test]
    fn statuses_map_to_build_status() {
        assert_eq!(job("success", None).build_status(), Some(BuildStatus::Success));
        assert_eq!(job("failed", None).build_status(), Some(BuildStatus::Failure));
        assert_eq!(job("canceled", None).build_status(), Some(BuildStatus::Aborted));
        assert_eq!(job("running", None).build_status(), Some(BuildStatus::Running));
        assert_eq!(job("skipped", None).build_status(), None);
    }

    #[test]
    fn fractional_seconds_become_milliseconds() {
        assert_eq!(job("success", Some(12.345)).duration_ms(), 12_345);
        assert_eq!(job("running", None).duration_ms(), 0);
        assert_eq!(job("failed", Some(-1.0)).duration_ms(), 0);
    }
}
