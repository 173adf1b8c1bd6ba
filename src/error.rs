use thiserror::Error;

use crate::providers::Vendor;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Failed to connect to {vendor}: {reason}")]
    Connect { vendor: Vendor, reason: String },

    #[error("Vendor request failed ({}): {body}", status_label(.status))]
    Fetch { status: Option<u16>, body: String },

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0} integration is not connected")]
    NotConnected(Vendor),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    /// Wraps a transport-level failure (DNS, TLS, timeout, decode) as a fetch error.
    pub fn transport(err: &reqwest::Error) -> Self {
        Self::Fetch {
            status: err.status().map(|s| s.as_u16()),
            body: err.to_string(),
        }
    }
}

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "transport error".to_string(), |s| format!("status {s}"))
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_display_includes_status_and_body() {
        let err = DashboardError::Fetch {
            status: Some(404),
            body: "job not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Vendor request failed (status 404): job not found"
        );
    }

    #[test]
    fn fetch_error_without_status_reads_as_transport_error() {
        let err = DashboardError::Fetch {
            status: None,
            body: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("transport error"));
    }

    #[test]
    fn not_connected_names_the_vendor() {
        let err = DashboardError::NotConnected(Vendor::GitLab);
        assert_eq!(err.to_string(), "gitlab integration is not connected");
    }
}
