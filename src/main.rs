mod aggregator;
mod alerts;
mod api;
mod cli;
mod config;
mod error;
mod metrics;
mod output;
mod providers;
mod reference;
mod webhooks;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting CI/CD Dashboard");
    cli.execute().await?;

    Ok(())
}
