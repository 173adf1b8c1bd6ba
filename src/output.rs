use std::collections::BTreeMap;
use std::fmt::Display;

use console::{style, StyledObject};

use crate::providers::{ConnectionInfo, ConnectionStatus, Vendor};

fn bright_green(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

fn bright_red(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().red()
}

fn cyan(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

fn dim(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

fn magenta_bold(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

/// Prints the dashboard banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("CI/CD Dashboard"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Jenkins, GitHub Actions and GitLab in one API")
    );
}

/// Prints the listen address and one line per vendor with its connection state.
pub fn print_startup(address: &str, connections: &BTreeMap<Vendor, ConnectionInfo>) {
    eprintln!("  {} {}", dim("API:"), cyan(format!("http://{address}/api/v1")));

    for vendor in Vendor::ALL {
        let line = match connections.get(&vendor) {
            Some(info) if info.status == ConnectionStatus::Connected => format!(
                "{} {}",
                bright_green("connected"),
                dim(format!("{} @ {}", info.username, info.base_url))
            ),
            Some(info) => format!("{} {}", bright_red("error"), dim(&info.message)),
            None => dim("not configured").to_string(),
        };
        eprintln!("  {:<8} {line}", format!("{vendor}:"));
    }
    eprintln!();
}
