use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::alerts::{AlertStore, LogNotifier};
use crate::api::{self, AppState};
use crate::config::Config;
use crate::output;
use crate::providers::{client_for, HttpSettings};

#[derive(Parser)]
#[command(name = "cicd-dashboard")]
#[command(author, version, about = "CI/CD Dashboard backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, global = true, env = "CICD_DASHBOARD_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the REST API server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long, env = "GITHUB_WEBHOOK_SECRET", hide_env_values = true)]
        github_webhook_secret: Option<String>,

        #[arg(long, env = "GITLAB_WEBHOOK_SECRET", hide_env_values = true)]
        gitlab_webhook_secret: Option<String>,
    },
    /// Write a default configuration file
    InitConfig {
        #[arg(default_value = "cicd-dashboard.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long, default_value_t = false)]
        force: bool,
    },
}

impl Cli {
    async fn execute_serve(
        &self,
        host: Option<&str>,
        port: Option<u16>,
        github_webhook_secret: Option<&str>,
        gitlab_webhook_secret: Option<&str>,
    ) -> Result<()> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(host) = host {
            config.server.host = host.to_owned();
        }
        if let Some(port) = port {
            config.server.port = port;
        }
        if let Some(secret) = github_webhook_secret {
            config.webhooks.github_secret = Some(secret.to_owned());
        }
        if let Some(secret) = gitlab_webhook_secret {
            config.webhooks.gitlab_secret = Some(secret.to_owned());
        }

        let http = config.http_settings();
        let aggregator = connect_configured(&config, &http).await;
        let alerts = AlertStore::new(Arc::new(LogNotifier))
            .with_default_limit(config.alerts.default_limit);
        let secrets = config.webhook_secrets();

        if secrets.github.is_none() {
            warn!("No GitHub webhook secret configured, GitHub deliveries will be rejected");
        }
        if secrets.gitlab.is_none() {
            warn!("No GitLab webhook secret configured, GitLab deliveries will be rejected");
        }

        let address = format!("{}:{}", config.server.host, config.server.port);
        output::print_startup(&address, &aggregator.connection_status());

        let state = AppState::new(aggregator, alerts, http, secrets);
        let app = api::router(state);

        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind {address}"))?;
        info!("Listening on http://{address}");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;

        info!("Server stopped");
        Ok(())
    }

    fn execute_init_config(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!(
                "{} already exists, pass --force to overwrite it",
                path.display()
            );
        }

        Config::default().save(path)?;
        info!("Default configuration written to: {}", path.display());
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Serve {
                host,
                port,
                github_webhook_secret,
                gitlab_webhook_secret,
            } => {
                self.execute_serve(
                    host.as_deref(),
                    *port,
                    github_webhook_secret.as_deref(),
                    gitlab_webhook_secret.as_deref(),
                )
                .await
            }
            Commands::InitConfig { path, force } => Self::execute_init_config(path, *force),
        }
    }
}

/// Connects every integration listed in the configuration. A vendor that
/// fails to connect is logged and left out; it can be connected later
/// through the API.
async fn connect_configured(config: &Config, http: &HttpSettings) -> Aggregator {
    let mut aggregator = Aggregator::new();

    for (vendor, setup) in config.integrations.configured() {
        let client = match client_for(vendor, setup, http) {
            Ok(client) => client,
            Err(e) => {
                warn!("Skipping {vendor} integration: {e}");
                continue;
            }
        };

        match aggregator.connect(client).await {
            Ok(info) => info!("{}", info.message),
            Err(e) => warn!("Failed to connect {vendor} integration: {e}"),
        }
    }

    aggregator
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
