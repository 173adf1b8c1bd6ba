mod github;
mod gitlab;
pub mod http;
mod jenkins;
mod types;

use async_trait::async_trait;

pub use github::GitHubClient;
pub use gitlab::GitLabClient;
pub use http::HttpSettings;
pub use jenkins::JenkinsClient;
pub use types::{
    BuildRecord, BuildStatus, ConnectionInfo, ConnectionStatus, Credentials, IntegrationSetup,
    PipelineSummary, ProjectSummary, Vendor,
};

use crate::error::{DashboardError, Result};
use crate::reference::{BuildRef, PipelineRef};

/// Capability interface every vendor client implements.
///
/// Clients are constructed with their credentials and base URL; `connect`
/// verifies them against the vendor. All methods are plain request/response
/// calls without retries, and every failure is returned as a value.
#[async_trait]
pub trait VendorClient: Send + Sync {
    fn vendor(&self) -> Vendor;

    /// Verifies credentials and reachability, returning the connection details.
    async fn connect(&self) -> Result<ConnectionInfo>;

    async fn list_pipelines(&self) -> Result<Vec<PipelineSummary>>;

    async fn get_pipeline(&self, pipeline: &PipelineRef) -> Result<PipelineSummary>;

    async fn list_builds(&self, pipeline: &PipelineRef, limit: usize) -> Result<Vec<BuildRecord>>;

    async fn get_build(&self, build: &BuildRef) -> Result<BuildRecord>;

    async fn get_logs(&self, build: &BuildRef) -> Result<String>;

    /// Starts a new build of the pipeline.
    async fn trigger_build(&self, pipeline: &PipelineRef) -> Result<()> {
        Err(DashboardError::Unsupported(format!(
            "{} does not support triggering '{pipeline}'",
            self.vendor()
        )))
    }

    /// Lists the repositories or projects the account can watch.
    async fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        Err(DashboardError::Unsupported(format!(
            "{} does not expose a project listing",
            self.vendor()
        )))
    }
}

/// Builds the client for a vendor from an integration setup.
///
/// # Errors
///
/// Returns `Config` when the base URL is missing (Jenkins) or invalid, or a
/// watched GitHub repository is not in `owner/repo` form.
pub fn client_for(
    vendor: Vendor,
    setup: &IntegrationSetup,
    settings: &HttpSettings,
) -> Result<Box<dyn VendorClient>> {
    let base_url = setup
        .base_url
        .as_deref()
        .or_else(|| vendor.default_base_url())
        .ok_or_else(|| DashboardError::Config(format!("{vendor} requires a base_url")))?;

    let client: Box<dyn VendorClient> = match vendor {
        Vendor::Jenkins => Box::new(JenkinsClient::new(base_url, &setup.credentials, settings)?),
        Vendor::GitHub => Box::new(GitHubClient::new(
            base_url,
            &setup.credentials,
            &setup.repositories,
            settings,
        )?),
        Vendor::GitLab => Box::new(GitLabClient::new(
            base_url,
            &setup.credentials,
            setup.projects.clone(),
            settings,
        )?),
    };

    Ok(client)
}

/// Error for a reference handed to the wrong vendor's client.
pub(crate) fn foreign_reference(vendor: Vendor, reference: &impl std::fmt::Display) -> DashboardError {
    DashboardError::InvalidReference(format!("'{reference}' is not a {vendor} reference"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(base_url: Option<&str>) -> IntegrationSetup {
        IntegrationSetup {
            credentials: Credentials {
                username: "bot".to_string(),
                password: "secret".to_string(),
            },
            base_url: base_url.map(ToString::to_string),
            repositories: vec!["acme/widgets".to_string()],
            projects: vec![42],
        }
    }

    #[test]
    fn jenkins_requires_a_base_url() {
        let result = client_for(Vendor::Jenkins, &setup(None), &HttpSettings::default());
        assert!(matches!(result, Err(DashboardError::Config(_))));
    }

    #[test]
    fn hosted_vendors_fall_back_to_default_base_url() {
        for vendor in [Vendor::GitHub, Vendor::GitLab] {
            let client = client_for(vendor, &setup(None), &HttpSettings::default()).unwrap();
            assert_eq!(client.vendor(), vendor);
        }
    }

    #[test]
    fn invalid_watched_repository_is_rejected() {
        let mut setup = setup(None);
        setup.repositories = vec!["not-a-repo-path".to_string()];
        let result = client_for(Vendor::GitHub, &setup, &HttpSettings::default());
        assert!(matches!(result, Err(DashboardError::Config(_))));
    }
}
