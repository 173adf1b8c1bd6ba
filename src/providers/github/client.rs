use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};

use super::types::{
    GitHubJob, GitHubRepository, GitHubUser, GitHubWorkflowRun, WorkflowJobsResponse,
    WorkflowRunsResponse,
};
use crate::error::{DashboardError, Result};
use crate::providers::http::{accept_headers, Auth, HttpClient, HttpSettings};
use crate::providers::types::elapsed_ms;
use crate::providers::{
    foreign_reference, BuildRecord, ConnectionInfo, ConnectionStatus, Credentials,
    PipelineSummary, ProjectSummary, Vendor, VendorClient,
};
use crate::reference::{BuildRef, PipelineRef};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Workflow runs listed per watched repository.
pub(super) const RUNS_PER_REPOSITORY: usize = 20;

/// GitHub Actions client.
///
/// A workflow run is exposed as a pipeline and each of its jobs as a build.
pub struct GitHubClient {
    http: HttpClient,
    username: String,
    /// Watched repositories as (owner, repo)
    repositories: Vec<(String, String)>,
}

impl GitHubClient {
    /// Create a new GitHub API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - GitHub API base URL (e.g., "https://api.github.com")
    /// * `credentials` - Username and password, or a `ghp_`/`github_pat_` token
    /// * `repositories` - Watched repositories in "owner/repo" format
    /// * `settings` - Shared HTTP settings
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if the base URL is invalid or a repository path
    /// is not in "owner/repo" format.
    pub fn new(
        base_url: &str,
        credentials: &Credentials,
        repositories: &[String],
        settings: &HttpSettings,
    ) -> Result<Self> {
        let repositories = repositories
            .iter()
            .map(|path| split_repository(path))
            .collect::<Result<Vec<_>>>()?;

        let http = HttpClient::new(
            base_url,
            Auth::select(Vendor::GitHub, credentials),
            settings,
            accept_headers(GITHUB_ACCEPT),
        )?;

        Ok(Self {
            http,
            username: credentials.username.clone(),
            repositories,
        })
    }

    fn run_parts(pipeline: &PipelineRef) -> Result<(&str, &str, String)> {
        match pipeline {
            PipelineRef::GitHub {
                owner,
                repo,
                run_id,
            } => Ok((owner, repo, run_id.to_string())),
            other => Err(foreign_reference(Vendor::GitHub, other)),
        }
    }

    fn job_parts(build: &BuildRef) -> Result<(&str, &str, u64, String)> {
        match build {
            BuildRef::GitHub {
                owner,
                repo,
                run_id,
                job_id,
            } => Ok((owner, repo, *run_id, job_id.to_string())),
            other => Err(foreign_reference(Vendor::GitHub, other)),
        }
    }

    /// Fetch recent workflow runs for one repository.
    async fn fetch_workflow_runs(&self, owner: &str, repo: &str) -> Result<Vec<GitHubWorkflowRun>> {
        let response: WorkflowRunsResponse = self
            .http
            .get_json(
                &["repos", owner, repo, "actions", "runs"],
                &[("per_page", RUNS_PER_REPOSITORY.to_string())],
            )
            .await?;

        Ok(response.workflow_runs)
    }

    fn to_summary(owner: &str, repo: &str, run: GitHubWorkflowRun) -> PipelineSummary {
        let name = run
            .name
            .or(run.display_title)
            .unwrap_or_else(|| format!("run {}", run.id));

        PipelineSummary {
            id: PipelineRef::GitHub {
                owner: owner.to_string(),
                repo: repo.to_string(),
                run_id: run.id,
            },
            vendor: Vendor::GitHub,
            name: format!("{name} ({owner}/{repo})"),
            status: run.conclusion.or(run.status),
            branch: run.head_branch,
            url: run.html_url,
        }
    }

    fn to_record(owner: &str, repo: &str, job: GitHubJob) -> BuildRecord {
        let pipeline = PipelineRef::GitHub {
            owner: owner.to_string(),
            repo: repo.to_string(),
            run_id: job.run_id,
        };

        BuildRecord {
            id: pipeline.build(job.id),
            status: job.build_status(),
            duration: elapsed_ms(job.started_at, job.completed_at),
            timestamp: job.started_at.map(|t| t.timestamp_millis()),
            name: Some(job.name),
            url: job.html_url,
            logs: None,
            vendor: Vendor::GitHub,
            pipeline,
        }
    }
}

#[async_trait]
impl VendorClient for GitHubClient {
    fn vendor(&self) -> Vendor {
        Vendor::GitHub
    }

    async fn connect(&self) -> Result<ConnectionInfo> {
        let user: GitHubUser = self
            .http
            .get_json(&["user"], &[])
            .await
            .map_err(|e| DashboardError::Connect {
                vendor: Vendor::GitHub,
                reason: e.to_string(),
            })?;

        info!("Connected to GitHub as {}", user.login);

        Ok(ConnectionInfo {
            vendor: Vendor::GitHub,
            username: self.username.clone(),
            base_url: self.http.base_url().to_string(),
            message: format!("Successfully connected to GitHub as {}", user.login),
            account: Some(user.login),
            connected_at: Utc::now(),
            status: ConnectionStatus::Connected,
        })
    }

    async fn list_pipelines(&self) -> Result<Vec<PipelineSummary>> {
        let mut pipelines = Vec::new();

        for (owner, repo) in &self.repositories {
            match self.fetch_workflow_runs(owner, repo).await {
                Ok(runs) => pipelines.extend(
                    runs.into_iter()
                        .map(|run| Self::to_summary(owner, repo, run)),
                ),
                Err(e) => warn!("Failed to fetch workflow runs for {owner}/{repo}: {e}"),
            }
        }

        Ok(pipelines)
    }

    async fn get_pipeline(&self, pipeline: &PipelineRef) -> Result<PipelineSummary> {
        let (owner, repo, run_id) = Self::run_parts(pipeline)?;
        let run: GitHubWorkflowRun = self
            .http
            .get_json(&["repos", owner, repo, "actions", "runs", &run_id], &[])
            .await?;

        Ok(Self::to_summary(owner, repo, run))
    }

    async fn list_builds(&self, pipeline: &PipelineRef, limit: usize) -> Result<Vec<BuildRecord>> {
        let (owner, repo, run_id) = Self::run_parts(pipeline)?;
        let response: WorkflowJobsResponse = self
            .http
            .get_json(
                &["repos", owner, repo, "actions", "runs", &run_id, "jobs"],
                &[("per_page", limit.clamp(1, 100).to_string())],
            )
            .await?;

        Ok(response
            .jobs
            .into_iter()
            .take(limit)
            .map(|job| Self::to_record(owner, repo, job))
            .collect())
    }

    async fn get_build(&self, build: &BuildRef) -> Result<BuildRecord> {
        let (owner, repo, run_id, job_id) = Self::job_parts(build)?;
        let job: GitHubJob = self
            .http
            .get_json(&["repos", owner, repo, "actions", "jobs", &job_id], &[])
            .await?;

        if job.run_id != run_id {
            return Err(DashboardError::NotFound(format!(
                "GitHub job {job_id} belongs to run {}, not {run_id}",
                job.run_id
            )));
        }

        Ok(Self::to_record(owner, repo, job))
    }

    async fn get_logs(&self, build: &BuildRef) -> Result<String> {
        let (owner, repo, _, job_id) = Self::job_parts(build)?;
        self.http
            .get_text(&["repos", owner, repo, "actions", "jobs", &job_id, "logs"])
            .await
    }

    async fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        let repositories: Vec<GitHubRepository> = self
            .http
            .get_json(&["user", "repos"], &[("per_page", "100".to_string())])
            .await?;

        Ok(repositories
            .into_iter()
            .map(|r| ProjectSummary {
                id: r.id.to_string(),
                name: r.full_name,
                url: r.html_url,
            })
            .collect())
    }
}

fn split_repository(path: &str) -> Result<(String, String)> {
    match path.split('/').collect::<Vec<_>>().as_slice() {
        [owner, repo] if !owner.is_empty() && !repo.is_empty() => {
            Ok(((*owner).to_string(), (*repo).to_string()))
        }
        _ => Err(DashboardError::Config(format!(
            "Repository path '{path}' must be in format 'owner/repo'"
        ))),
    }
}
