use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use log::{info, warn};
use serde::Serialize;

use crate::error::{DashboardError, Result};
use crate::metrics::{
    average_duration, calculate_rate, daily_trends, DashboardMetrics, PipelineMetrics,
    TrendMetrics, VendorStats,
};
use crate::providers::{
    BuildRecord, ConnectionInfo, ConnectionStatus, PipelineSummary, ProjectSummary, Vendor,
    VendorClient,
};
use crate::reference::{BuildRef, PipelineRef};

/// Pipelines per vendor whose builds are fetched by the fan-out.
pub const FANOUT_PIPELINES: usize = 10;
/// Builds fetched per pipeline by the fan-out.
pub const FANOUT_BUILDS: usize = 5;
/// Build limit used when computing dashboard metrics.
pub const DEFAULT_BUILD_LIMIT: usize = 100;
pub const RECENT_ACTIVITY: usize = 10;
pub const MAX_TREND_DAYS: u32 = 90;

struct Connection {
    client: Box<dyn VendorClient>,
    info: ConnectionInfo,
}

/// Items grouped by vendor. Every vendor has a key, empty when not connected.
#[derive(Debug, Clone, Serialize)]
pub struct VendorListing<T> {
    pub by_vendor: BTreeMap<Vendor, Vec<T>>,
    pub total: usize,
}

impl<T> VendorListing<T> {
    fn new(by_vendor: BTreeMap<Vendor, Vec<T>>) -> Self {
        let total = by_vendor.values().map(Vec::len).sum();
        Self { by_vendor, total }
    }

    fn for_vendor(&self, vendor: Vendor) -> &[T] {
        self.by_vendor.get(&vendor).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn empty_by_vendor<T>() -> BTreeMap<Vendor, Vec<T>> {
    Vendor::ALL.into_iter().map(|v| (v, Vec::new())).collect()
}

/// Holds at most one live client per vendor and merges their data.
///
/// Vendor calls run one after another. A vendor that fails while listing
/// contributes an empty list and a warning instead of failing the whole view.
#[derive(Default)]
pub struct Aggregator {
    connections: BTreeMap<Vendor, Connection>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifies the client and stores it, replacing any previous client for the vendor.
    pub async fn connect(&mut self, client: Box<dyn VendorClient>) -> Result<ConnectionInfo> {
        let info = client.connect().await?;
        self.insert(client, info.clone());
        Ok(info)
    }

    /// Stores an already verified client.
    pub fn insert(&mut self, client: Box<dyn VendorClient>, info: ConnectionInfo) {
        let vendor = client.vendor();
        if self
            .connections
            .insert(vendor, Connection { client, info })
            .is_some()
        {
            info!("Replaced existing {vendor} connection");
        } else {
            info!("Connected {vendor} integration");
        }
    }

    pub fn disconnect(&mut self, vendor: Vendor) -> Result<()> {
        self.connections
            .remove(&vendor)
            .map(|_| info!("Disconnected {vendor} integration"))
            .ok_or_else(|| DashboardError::NotFound(format!("{vendor} service not found")))
    }

    /// Drops every connection, returning how many there were.
    pub fn disconnect_all(&mut self) -> usize {
        let count = self.connections.len();
        self.connections.clear();
        info!("Disconnected all integrations ({count})");
        count
    }

    pub fn connection_status(&self) -> BTreeMap<Vendor, ConnectionInfo> {
        self.connections
            .iter()
            .map(|(vendor, conn)| (*vendor, conn.info.clone()))
            .collect()
    }

    /// Re-runs `connect` for every live client without touching stored state.
    pub async fn check_connections(&self) -> BTreeMap<Vendor, Result<ConnectionInfo>> {
        let mut checks = BTreeMap::new();
        for (vendor, conn) in &self.connections {
            checks.insert(*vendor, conn.client.connect().await);
        }
        checks
    }

    /// Stores the outcome of [`Aggregator::check_connections`]. Vendors that
    /// were disconnected in the meantime are skipped.
    pub fn record_checks(
        &mut self,
        checks: BTreeMap<Vendor, Result<ConnectionInfo>>,
    ) -> BTreeMap<Vendor, ConnectionInfo> {
        for (vendor, outcome) in checks {
            let Some(conn) = self.connections.get_mut(&vendor) else {
                continue;
            };
            match outcome {
                Ok(info) => conn.info = info,
                Err(e) => {
                    warn!("Connection test failed for {vendor}: {e}");
                    conn.info.status = ConnectionStatus::Error;
                    conn.info.message = e.to_string();
                }
            }
        }

        self.connection_status()
    }

    fn client(&self, vendor: Vendor) -> Result<&dyn VendorClient> {
        self.connections
            .get(&vendor)
            .map(|conn| conn.client.as_ref())
            .ok_or(DashboardError::NotConnected(vendor))
    }

    pub async fn all_pipelines(&self) -> VendorListing<PipelineSummary> {
        let mut by_vendor = empty_by_vendor();

        for (vendor, conn) in &self.connections {
            match conn.client.list_pipelines().await {
                Ok(pipelines) => {
                    by_vendor.insert(*vendor, pipelines);
                }
                Err(e) => warn!("Failed to list {vendor} pipelines: {e}"),
            }
        }

        VendorListing::new(by_vendor)
    }

    /// Recent builds per vendor, newest first, at most `limit` per vendor.
    ///
    /// Builds come from the first [`FANOUT_PIPELINES`] pipelines of each vendor,
    /// [`FANOUT_BUILDS`] builds each.
    pub async fn all_builds(&self, limit: usize) -> VendorListing<BuildRecord> {
        let mut by_vendor = empty_by_vendor();

        for (vendor, conn) in &self.connections {
            let mut builds = fan_out_builds(conn.client.as_ref()).await;
            newest_first(&mut builds);
            builds.truncate(limit);
            by_vendor.insert(*vendor, builds);
        }

        VendorListing::new(by_vendor)
    }

    /// Headline metrics. Success and failure rates, and the average build time,
    /// only cover Jenkins builds.
    pub async fn dashboard_metrics(&self) -> DashboardMetrics {
        let pipelines = self.all_pipelines().await;
        let builds = self.all_builds(DEFAULT_BUILD_LIMIT).await;

        let jenkins = builds.for_vendor(Vendor::Jenkins);
        let successful = jenkins.iter().filter(|b| b.is_success()).count();
        let failed = jenkins.iter().filter(|b| b.is_failure()).count();

        let mut recent: Vec<BuildRecord> = builds.by_vendor.values().flatten().cloned().collect();
        newest_first(&mut recent);
        recent.truncate(RECENT_ACTIVITY);

        DashboardMetrics {
            total_pipelines: pipelines.total,
            total_builds: builds.total,
            success_rate: calculate_rate(successful, jenkins.len()),
            failure_rate: calculate_rate(failed, jenkins.len()),
            average_build_time: average_duration(jenkins),
            recent_activity: recent,
            service_status: self.connection_status(),
        }
    }

    pub async fn pipeline_metrics(&self) -> PipelineMetrics {
        let pipelines = self.all_pipelines().await;
        let builds = self.all_builds(DEFAULT_BUILD_LIMIT).await;

        let by_vendor: BTreeMap<Vendor, VendorStats> = self
            .connections
            .keys()
            .map(|vendor| {
                let stats = VendorStats::from_builds(
                    pipelines.for_vendor(*vendor).len(),
                    builds.for_vendor(*vendor),
                );
                (*vendor, stats)
            })
            .collect();

        PipelineMetrics {
            by_vendor,
            total_pipelines: pipelines.total,
            total_builds: builds.total,
        }
    }

    /// Daily buckets over the last `days` calendar days, today included
    /// (clamped to 1..=90).
    pub async fn trend_metrics(&self, days: u32) -> TrendMetrics {
        let days = days.clamp(1, MAX_TREND_DAYS);
        let cutoff = trend_cutoff(Utc::now(), days);
        let builds = self.all_builds(DEFAULT_BUILD_LIMIT).await;

        let trends = daily_trends(
            builds
                .by_vendor
                .values()
                .flatten()
                .filter(|b| b.timestamp.is_some_and(|ts| ts >= cutoff)),
        );

        TrendMetrics { days, trends }
    }

    pub async fn pipeline(&self, pipeline: &PipelineRef) -> Result<PipelineSummary> {
        self.client(pipeline.vendor())?.get_pipeline(pipeline).await
    }

    pub async fn builds_for(&self, pipeline: &PipelineRef, limit: usize) -> Result<Vec<BuildRecord>> {
        self.client(pipeline.vendor())?
            .list_builds(pipeline, limit)
            .await
    }

    pub async fn build(&self, build: &BuildRef) -> Result<BuildRecord> {
        self.client(build.vendor())?.get_build(build).await
    }

    pub async fn logs(&self, build: &BuildRef) -> Result<String> {
        self.client(build.vendor())?.get_logs(build).await
    }

    pub async fn trigger(&self, pipeline: &PipelineRef) -> Result<()> {
        self.client(pipeline.vendor())?
            .trigger_build(pipeline)
            .await
    }

    pub async fn projects(&self, vendor: Vendor) -> Result<Vec<ProjectSummary>> {
        self.client(vendor)?.list_projects().await
    }
}

async fn fan_out_builds(client: &dyn VendorClient) -> Vec<BuildRecord> {
    let vendor = client.vendor();
    let pipelines = match client.list_pipelines().await {
        Ok(pipelines) => pipelines,
        Err(e) => {
            warn!("Failed to list {vendor} pipelines: {e}");
            return Vec::new();
        }
    };

    let mut builds = Vec::new();
    for pipeline in pipelines.iter().take(FANOUT_PIPELINES) {
        match client.list_builds(&pipeline.id, FANOUT_BUILDS).await {
            Ok(found) => builds.extend(found),
            Err(e) => warn!("Failed to fetch builds for {}: {e}", pipeline.id),
        }
    }
    builds
}

/// Millisecond timestamp of UTC midnight starting the oldest day of a
/// `days`-day window that ends today.
fn trend_cutoff(now: DateTime<Utc>, days: u32) -> i64 {
    let first_day = now.date_naive() - Duration::days(i64::from(days.max(1)) - 1);
    first_day.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

/// Sorts by timestamp descending; builds without one go last.
fn newest_first(builds: &mut [BuildRecord]) {
    builds.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
