use std::time::Duration;

use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use super::types::{Credentials, Vendor};
use crate::error::{DashboardError, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const GITHUB_TOKEN_PREFIXES: [&str; 2] = ["ghp_", "github_pat_"];
const GITLAB_TOKEN_PREFIX: &str = "glpat-";

/// Transport settings shared by every vendor client.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("cicd-dashboard/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// How a client authenticates against its vendor.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    Basic { username: String, password: String },
    /// A token sent verbatim in a single header
    Header { name: &'static str, value: String },
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Basic { username, .. } => write!(f, "Basic({username})"),
            Auth::Header { name, .. } => write!(f, "Header({name})"),
        }
    }
}

impl Auth {
    /// Picks the authentication scheme for a vendor from the credential shape.
    ///
    /// A password carrying a vendor token prefix (`ghp_`/`github_pat_` for
    /// GitHub, `glpat-` for GitLab) is sent as a token; anything else falls back
    /// to basic auth. Jenkins always uses basic auth.
    pub fn select(vendor: Vendor, credentials: &Credentials) -> Self {
        let password = credentials.password.as_str();

        match vendor {
            Vendor::GitHub if GITHUB_TOKEN_PREFIXES.iter().any(|p| password.starts_with(p)) => {
                Auth::Header {
                    name: "authorization",
                    value: format!("token {password}"),
                }
            }
            Vendor::GitLab if password.starts_with(GITLAB_TOKEN_PREFIX) => Auth::Header {
                name: "private-token",
                value: password.to_string(),
            },
            _ => Auth::Basic {
                username: credentials.username.clone(),
                password: password.to_string(),
            },
        }
    }
}

/// Thin authenticated wrapper around `reqwest` rooted at a vendor base URL.
///
/// Every non-2xx answer and every transport failure becomes a
/// `DashboardError::Fetch`; nothing is retried.
pub struct HttpClient {
    client: Client,
    base_url: Url,
    auth: Auth,
}

impl HttpClient {
    pub fn new(
        base_url: &str,
        auth: Auth,
        settings: &HttpSettings,
        default_headers: HeaderMap,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| DashboardError::Config(format!("Failed to create HTTP client: {e}")))?;

        // A trailing slash keeps any path prefix (e.g. https://host/jenkins) when joining
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| DashboardError::Config(format!("Invalid base URL '{base_url}': {e}")))?;

        if base_url.cannot_be_a_base() {
            return Err(DashboardError::Config(format!(
                "Invalid base URL '{base_url}'"
            )));
        }

        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends percent-encoded path segments to the base URL.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| DashboardError::Config(format!("Invalid base URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn auth_request(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        match &self.auth {
            Auth::Basic { username, password } => Ok(request.basic_auth(username, Some(password))),
            Auth::Header { name, value } => {
                let name = HeaderName::from_static(*name);
                let mut value = HeaderValue::from_str(value)
                    .map_err(|e| DashboardError::Config(format!("Invalid token: {e}")))?;
                value.set_sensitive(true);
                Ok(request.header(name, value))
            }
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .auth_request(request)?
            .send()
            .await
            .map_err(|e| DashboardError::transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(DashboardError::Fetch {
                status: Some(status.as_u16()),
                body,
            });
        }

        Ok(response)
    }

    pub async fn get_json<T>(&self, segments: &[&str], query: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        debug!("GET {url}");

        self.send(self.client.get(url).query(query))
            .await?
            .json()
            .await
            .map_err(|e| DashboardError::transport(&e))
    }

    pub async fn get_text(&self, segments: &[&str]) -> Result<String> {
        let url = self.endpoint(segments)?;
        debug!("GET {url}");

        self.send(self.client.get(url))
            .await?
            .text()
            .await
            .map_err(|e| DashboardError::transport(&e))
    }

    pub async fn post_empty(&self, segments: &[&str]) -> Result<()> {
        let url = self.endpoint(segments)?;
        debug!("POST {url}");

        self.send(self.client.post(url)).await?;
        Ok(())
    }
}

/// Default headers carrying a fixed `Accept` value.
pub fn accept_headers(accept: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(accept));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(password: &str) -> Credentials {
        Credentials {
            username: "ci-bot".to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn github_pat_prefixes_select_token_auth() {
        for password in ["ghp_abc123", "github_pat_11ABC"] {
            let auth = Auth::select(Vendor::GitHub, &credentials(password));
            assert_eq!(
                auth,
                Auth::Header {
                    name: "authorization",
                    value: format!("token {password}"),
                }
            );
        }
    }

    #[test]
    fn gitlab_pat_prefix_selects_private_token_header() {
        let auth = Auth::select(Vendor::GitLab, &credentials("glpat-xyz"));
        assert_eq!(
            auth,
            Auth::Header {
                name: "private-token",
                value: "glpat-xyz".to_string(),
            }
        );
    }

    #[test]
    fn other_passwords_fall_back_to_basic_auth() {
        assert!(matches!(
            Auth::select(Vendor::GitHub, &credentials("hunter2")),
            Auth::Basic { .. }
        ));
        assert!(matches!(
            Auth::select(Vendor::GitLab, &credentials("ghp_wrong_vendor")),
            Auth::Basic { .. }
        ));
    }

    #[test]
    fn jenkins_always_uses_basic_auth() {
        let auth = Auth::select(Vendor::Jenkins, &credentials("ghp_looks_like_a_token"));
        assert!(matches!(auth, Auth::Basic { .. }));
    }

    #[test]
    fn auth_debug_never_prints_secrets() {
        let auth = Auth::select(Vendor::GitLab, &credentials("glpat-xyz"));
        assert!(!format!("{auth:?}").contains("glpat-xyz"));
    }

    #[test]
    fn endpoint_keeps_base_path_and_encodes_segments() {
        let client = HttpClient::new(
            "https://ci.example.com/jenkins/",
            Auth::select(Vendor::Jenkins, &credentials("pw")),
            &HttpSettings::default(),
            HeaderMap::new(),
        )
        .unwrap();

        let url = client.endpoint(&["job", "release build", "api", "json"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://ci.example.com/jenkins/job/release%20build/api/json"
        );
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        let result = HttpClient::new(
            "not a url",
            Auth::select(Vendor::Jenkins, &credentials("pw")),
            &HttpSettings::default(),
            HeaderMap::new(),
        );
        assert!(matches!(result, Err(DashboardError::Config(_))));
    }
}
