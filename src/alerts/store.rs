use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};
use serde_json::{json, Map, Value};

use super::{
    Alert, AlertFilter, AlertRule, AlertStats, AlertStatus, AlertUpdate, NewAlert, NewRule,
    Notifier, RuleUpdate, Severity,
};
use crate::error::{DashboardError, Result};

pub const DEFAULT_LIST_LIMIT: usize = 50;
/// Upper bound on demo alerts generated per call.
pub const MAX_DEMO_ALERTS: usize = 20;

struct Stored {
    seq: u64,
    alert: Alert,
}

/// (title, message, severity, category, source, status)
const DEMO_TEMPLATES: &[(&str, &str, Severity, &str, &str, AlertStatus)] = &[
    (
        "Build failed on main",
        "api-server build #142 failed during the test stage",
        Severity::High,
        "build",
        "jenkins",
        AlertStatus::Active,
    ),
    (
        "Deployment pipeline stalled",
        "deploy-production has been running for over 45 minutes",
        Severity::Critical,
        "pipeline",
        "gitlab",
        AlertStatus::Active,
    ),
    (
        "Flaky test detected",
        "integration-tests failed 3 of the last 10 runs",
        Severity::Medium,
        "quality",
        "github",
        AlertStatus::Acknowledged,
    ),
    (
        "Build duration regression",
        "web-frontend build time rose 40% over the 7 day average",
        Severity::Low,
        "performance",
        "jenkins",
        AlertStatus::Active,
    ),
    (
        "Runner capacity restored",
        "All self-hosted runners are back online",
        Severity::Info,
        "infrastructure",
        "github",
        AlertStatus::Resolved,
    ),
];

/// In-memory alert and rule storage.
///
/// Ids are `alert_<sequence>_<epoch_seconds>`; the sequence is process-local
/// and also breaks ties when two alerts share a creation instant.
pub struct AlertStore {
    alerts: HashMap<String, Stored>,
    rules: BTreeMap<u64, AlertRule>,
    next_seq: u64,
    default_limit: usize,
    notifier: Arc<dyn Notifier>,
}

impl AlertStore {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            alerts: HashMap::new(),
            rules: BTreeMap::new(),
            next_seq: 1,
            default_limit: DEFAULT_LIST_LIMIT,
            notifier,
        }
    }

    #[must_use]
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit.max(1);
        self
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    fn next_id(&mut self, prefix: &str) -> (u64, String) {
        let seq = self.next_seq;
        self.next_seq += 1;
        (seq, format!("{prefix}_{seq}_{}", Utc::now().timestamp()))
    }

    /// Stores a new alert and notifies when it starts out active.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` when the title is blank.
    pub fn create(&mut self, fields: NewAlert) -> Result<Alert> {
        if fields.title.trim().is_empty() {
            return Err(DashboardError::InvalidPayload(
                "alert title is required".to_string(),
            ));
        }

        let (seq, id) = self.next_id("alert");
        let now = Utc::now();
        let status = fields.status.unwrap_or(AlertStatus::Active);

        let alert = Alert {
            id: id.clone(),
            title: fields.title,
            message: fields.message,
            severity: fields.severity,
            status,
            category: fields.category,
            source: fields.source,
            pipeline_id: fields.pipeline_id,
            created_at: now,
            updated_at: now,
            acknowledged_at: (status == AlertStatus::Acknowledged).then_some(now),
            acknowledged_by: None,
            resolved_at: (status == AlertStatus::Resolved).then_some(now),
            resolved_by: None,
            resolution_notes: None,
            metadata: fields.metadata,
        };

        debug!("Created alert {id} ({:?})", alert.severity);
        if alert.status == AlertStatus::Active {
            self.notifier.notify(&alert);
        }

        self.alerts.insert(
            id,
            Stored {
                seq,
                alert: alert.clone(),
            },
        );
        Ok(alert)
    }

    pub fn get(&self, id: &str) -> Option<&Alert> {
        self.alerts.get(id).map(|s| &s.alert)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Alert> {
        self.alerts
            .get_mut(id)
            .map(|s| &mut s.alert)
            .ok_or_else(|| DashboardError::NotFound(format!("alert '{id}'")))
    }

    pub fn update(&mut self, id: &str, changes: AlertUpdate) -> Result<Alert> {
        let alert = self.get_mut(id)?;

        if let Some(title) = changes.title {
            if title.trim().is_empty() {
                return Err(DashboardError::InvalidPayload(
                    "alert title cannot be blank".to_string(),
                ));
            }
            alert.title = title;
        }
        if let Some(message) = changes.message {
            alert.message = message;
        }
        if let Some(severity) = changes.severity {
            alert.severity = severity;
        }
        if let Some(category) = changes.category {
            alert.category = category;
        }
        if let Some(metadata) = changes.metadata {
            alert.metadata = metadata;
        }
        alert.updated_at = Utc::now();

        Ok(alert.clone())
    }

    /// Marks an active alert as acknowledged.
    ///
    /// Acknowledging an already acknowledged alert keeps the first stamp.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `Conflict` when the alert is resolved.
    pub fn acknowledge(&mut self, id: &str, user: &str) -> Result<Alert> {
        let alert = self.get_mut(id)?;

        match alert.status {
            AlertStatus::Resolved => Err(DashboardError::Conflict(format!(
                "alert '{id}' is already resolved"
            ))),
            AlertStatus::Acknowledged => Ok(alert.clone()),
            AlertStatus::Active => {
                let now = Utc::now();
                alert.status = AlertStatus::Acknowledged;
                alert.acknowledged_at = Some(now);
                alert.acknowledged_by = Some(user.to_string());
                alert.updated_at = now;
                info!("Alert {id} acknowledged by {user}");
                Ok(alert.clone())
            }
        }
    }

    /// Resolves an alert. Resolution is final: a second resolve is rejected
    /// and leaves the original stamp in place.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `Conflict` when the alert is already resolved.
    pub fn resolve(&mut self, id: &str, user: &str, notes: Option<String>) -> Result<Alert> {
        let alert = self.get_mut(id)?;

        if alert.status == AlertStatus::Resolved {
            return Err(DashboardError::Conflict(format!(
                "alert '{id}' is already resolved"
            )));
        }

        let now = Utc::now();
        alert.status = AlertStatus::Resolved;
        alert.resolved_at = Some(now);
        alert.resolved_by = Some(user.to_string());
        alert.resolution_notes = notes;
        alert.updated_at = now;
        info!("Alert {id} resolved by {user}");

        Ok(alert.clone())
    }

    pub fn delete(&mut self, id: &str) -> Result<Alert> {
        self.alerts
            .remove(id)
            .map(|s| s.alert)
            .ok_or_else(|| DashboardError::NotFound(format!("alert '{id}'")))
    }

    /// Matching alerts, newest first, capped at the filter limit or the store default.
    pub fn list(&self, filter: &AlertFilter) -> Vec<Alert> {
        let mut matching: Vec<&Stored> = self
            .alerts
            .values()
            .filter(|s| filter.matches(&s.alert))
            .collect();

        matching.sort_by(|a, b| {
            b.alert
                .created_at
                .cmp(&a.alert.created_at)
                .then(b.seq.cmp(&a.seq))
        });

        matching
            .into_iter()
            .take(filter.limit.unwrap_or(self.default_limit))
            .map(|s| s.alert.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn stats(&self) -> AlertStats {
        let mut by_status: BTreeMap<AlertStatus, usize> =
            AlertStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        let mut by_severity: BTreeMap<Severity, usize> =
            Severity::ALL.into_iter().map(|s| (s, 0)).collect();
        let mut by_category: BTreeMap<String, usize> = BTreeMap::new();

        for Stored { alert, .. } in self.alerts.values() {
            *by_status.entry(alert.status).or_default() += 1;
            *by_severity.entry(alert.severity).or_default() += 1;
            *by_category.entry(alert.category.clone()).or_default() += 1;
        }

        AlertStats {
            total: self.alerts.len(),
            by_status,
            by_severity,
            by_category,
        }
    }

    /// Creates up to [`MAX_DEMO_ALERTS`] synthetic alerts tagged `metadata.demo = true`.
    pub fn generate_demo(&mut self, count: usize) -> Result<Vec<Alert>> {
        let count = count.min(MAX_DEMO_ALERTS);
        let mut created = Vec::with_capacity(count);

        for (n, (title, message, severity, category, source, status)) in
            DEMO_TEMPLATES.iter().cycle().take(count).enumerate()
        {
            let mut metadata = Map::new();
            metadata.insert("demo".to_string(), Value::Bool(true));
            metadata.insert("sequence".to_string(), json!(n + 1));

            created.push(self.create(NewAlert {
                title: (*title).to_string(),
                message: (*message).to_string(),
                severity: *severity,
                category: (*category).to_string(),
                source: (*source).to_string(),
                pipeline_id: None,
                status: Some(*status),
                metadata,
            })?);
        }

        info!("Generated {} demo alerts", created.len());
        Ok(created)
    }

    /// Removes every alert tagged as demo data, returning how many were removed.
    pub fn clear_demo(&mut self) -> usize {
        let before = self.alerts.len();
        self.alerts.retain(|_, s| !s.alert.is_demo());
        let removed = before - self.alerts.len();
        info!("Cleared {removed} demo alerts");
        removed
    }

    pub fn create_rule(&mut self, fields: NewRule) -> Result<AlertRule> {
        if fields.name.trim().is_empty() {
            return Err(DashboardError::InvalidPayload(
                "rule name is required".to_string(),
            ));
        }

        let (seq, id) = self.next_id("rule");
        let now = Utc::now();
        let rule = AlertRule {
            id,
            name: fields.name,
            condition: fields.condition,
            severity: fields.severity,
            enabled: fields.enabled,
            created_at: now,
            updated_at: now,
        };

        self.rules.insert(seq, rule.clone());
        Ok(rule)
    }

    /// Rules in creation order.
    pub fn list_rules(&self) -> Vec<AlertRule> {
        self.rules.values().cloned().collect()
    }

    fn rule_mut(&mut self, id: &str) -> Result<&mut AlertRule> {
        self.rules
            .values_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| DashboardError::NotFound(format!("rule '{id}'")))
    }

    pub fn update_rule(&mut self, id: &str, changes: RuleUpdate) -> Result<AlertRule> {
        let rule = self.rule_mut(id)?;

        if let Some(name) = changes.name {
            rule.name = name;
        }
        if let Some(condition) = changes.condition {
            rule.condition = condition;
        }
        if let Some(severity) = changes.severity {
            rule.severity = severity;
        }
        if let Some(enabled) = changes.enabled {
            rule.enabled = enabled;
        }
        rule.updated_at = Utc::now();

        Ok(rule.clone())
    }

    pub fn delete_rule(&mut self, id: &str) -> Result<AlertRule> {
        let seq = self
            .rules
            .iter()
            .find(|(_, r)| r.id == id)
            .map(|(seq, _)| *seq)
            .ok_or_else(|| DashboardError::NotFound(format!("rule '{id}'")))?;

        self.rules
            .remove(&seq)
            .ok_or_else(|| DashboardError::NotFound(format!("rule '{id}'")))
    }
}
