use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::providers::BuildStatus;

/// Authenticated user returned by `GET /user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

/// Repository returned by `GET /user/repos`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepository {
    pub id: u64,
    pub full_name: String,
    pub html_url: Option<String>,
}

/// GitHub Actions workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubWorkflowRun {
    /// Unique identifier for the workflow run
    pub id: u64,
    /// Name of the workflow
    pub name: Option<String>,
    /// Display title for the run
    pub display_title: Option<String>,
    /// Head branch or tag name
    pub head_branch: Option<String>,
    /// queued, in_progress, completed, ...
    pub status: Option<String>,
    /// Conclusion of the run (success, failure, etc.)
    pub conclusion: Option<String>,
    pub html_url: Option<String>,
    pub run_number: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Job within a GitHub Actions workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubJob {
    /// Unique identifier for the job
    pub id: u64,
    pub run_id: u64,
    /// Name of the job
    pub name: String,
    /// Status of the job
    pub status: Option<String>,
    /// Conclusion of the job
    pub conclusion: Option<String>,
    /// When the job started
    pub started_at: Option<DateTime<Utc>>,
    /// When the job completed
    pub completed_at: Option<DateTime<Utc>>,
    pub html_url: Option<String>,
}

impl GitHubJob {
    pub fn build_status(&self) -> Option<BuildStatus> {
        match self.conclusion.as_deref() {
            Some("success") => Some(BuildStatus::Success),
            Some("failure" | "timed_out" | "startup_failure") => Some(BuildStatus::Failure),
            Some("cancelled") => Some(BuildStatus::Aborted),
            Some(_) => None,
            None => match self.status.as_deref() {
                Some("in_progress" | "queued" | "waiting" | "pending") => Some(BuildStatus::Running),
                _ => None,
            },
        }
    }
}

/// Response from GitHub API for workflow runs.
#[derive(Debug, Deserialize)]
pub struct WorkflowRunsResponse {
    #[serde(default)]
    pub workflow_runs: Vec<GitHubWorkflowRun>,
}

/// Response from GitHub API for workflow jobs.
#[derive(Debug, Deserialize)]
pub struct WorkflowJobsResponse {
    #[serde(default)]
    pub jobs: Vec<GitHubJob>,
}
