use log::{info, warn};

use super::{Alert, Severity};

/// Receives every alert that is created in the `active` state.
pub trait Notifier: Send + Sync {
    fn notify(&self, alert: &Alert);
}

/// Writes alerts to the log, at `warn` for critical and high severities.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, alert: &Alert) {
        match alert.severity {
            Severity::Critical | Severity::High => warn!(
                "[{:?}] {} ({}): {}",
                alert.severity, alert.title, alert.id, alert.message
            ),
            _ => info!(
                "[{:?}] {} ({}): {}",
                alert.severity, alert.title, alert.id, alert.message
            ),
        }
    }
}
