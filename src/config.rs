use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::alerts::DEFAULT_LIST_LIMIT;
use crate::providers::http::DEFAULT_TIMEOUT_SECS;
use crate::providers::{HttpSettings, IntegrationSetup, Vendor};
use crate::webhooks::WebhookSecrets;

/// Configuration file structure for the dashboard server.
///
/// Configuration files are loaded from the current directory or a given path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Vendor HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub webhooks: WebhookConfig,

    #[serde(default)]
    pub alerts: AlertConfig,

    /// Integrations connected at startup
    #[serde(default)]
    pub integrations: IntegrationsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HttpConfig {
    /// Per-request timeout for vendor calls
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WebhookConfig {
    /// HMAC secret for `X-Hub-Signature-256`
    pub github_secret: Option<String>,

    /// Shared token expected in `X-Gitlab-Token`
    pub gitlab_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AlertConfig {
    /// Alerts returned by a list call without an explicit limit
    #[serde(default = "default_alert_limit")]
    pub default_limit: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IntegrationsConfig {
    pub jenkins: Option<IntegrationSetup>,
    pub github: Option<IntegrationSetup>,
    pub gitlab: Option<IntegrationSetup>,
}

impl IntegrationsConfig {
    /// Configured integrations in vendor order.
    pub fn configured(&self) -> Vec<(Vendor, &IntegrationSetup)> {
        [
            (Vendor::Jenkins, &self.jenkins),
            (Vendor::GitHub, &self.github),
            (Vendor::GitLab, &self.gitlab),
        ]
        .into_iter()
        .filter_map(|(vendor, setup)| setup.as_ref().map(|s| (vendor, s)))
        .collect()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            default_limit: default_alert_limit(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_alert_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./cicd-dashboard.toml
    /// 3. ./cicd-dashboard.json
    /// 4. ./cicd-dashboard.yaml
    /// 5. ./cicd-dashboard.yml
    ///
    /// Returns default configuration if no file is found. An explicitly
    /// specified path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "cicd-dashboard.toml",
            "cicd-dashboard.json",
            "cicd-dashboard.yaml",
            "cicd-dashboard.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .map_err(anyhow::Error::from)
                    .or_else(|_| serde_json::from_str(&contents).map_err(anyhow::Error::from))
                    .or_else(|_| serde_yaml::from_str(&contents).map_err(anyhow::Error::from))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml" | "yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.http.timeout_secs.max(1)),
            ..HttpSettings::default()
        }
    }

    pub fn webhook_secrets(&self) -> WebhookSecrets {
        WebhookSecrets {
            github: self.webhooks.github_secret.clone().filter(|s| !s.is_empty()),
            gitlab: self.webhooks.gitlab_secret.clone().filter(|s| !s.is_empty()),
        }
    }
}
