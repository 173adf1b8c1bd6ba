use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::providers::{BuildRecord, BuildStatus, ConnectionInfo, Vendor};

/// Headline numbers shown on the dashboard landing page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub total_pipelines: usize,
    pub total_builds: usize,
    pub success_rate: f64,
    pub failure_rate: f64,
    /// Mean of non-zero build durations, in milliseconds
    pub average_build_time: f64,
    pub recent_activity: Vec<BuildRecord>,
    pub service_status: BTreeMap<Vendor, ConnectionInfo>,
}

/// Build statistics for one vendor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorStats {
    pub pipelines: usize,
    pub builds: usize,
    pub successful: usize,
    pub failed: usize,
    pub running: usize,
    pub success_rate: f64,
    pub failure_rate: f64,
    pub average_duration: f64,
}

impl VendorStats {
    pub fn from_builds(pipelines: usize, builds: &[BuildRecord]) -> Self {
        let successful = builds.iter().filter(|b| b.is_success()).count();
        let failed = builds.iter().filter(|b| b.is_failure()).count();
        let running = builds
            .iter()
            .filter(|b| b.status == Some(BuildStatus::Running))
            .count();

        Self {
            pipelines,
            builds: builds.len(),
            successful,
            failed,
            running,
            success_rate: calculate_rate(successful, builds.len()),
            failure_rate: calculate_rate(failed, builds.len()),
            average_duration: average_duration(builds),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineMetrics {
    pub by_vendor: BTreeMap<Vendor, VendorStats>,
    pub total_pipelines: usize,
    pub total_builds: usize,
}

/// Build counts for one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendBucket {
    /// `YYYY-MM-DD`
    pub date: String,
    pub success: usize,
    pub failure: usize,
    pub total: usize,
    pub success_rate: f64,
    pub average_duration: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendMetrics {
    pub days: u32,
    pub trends: Vec<TrendBucket>,
}

/// Percentage of `count` in `total`, rounded to two decimals. Zero when `total` is zero.
#[allow(clippy::cast_precision_loss)]
pub fn calculate_rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(count as f64 / total as f64 * 100.0)
}

/// Mean of the non-zero durations, rounded to two decimals.
#[allow(clippy::cast_precision_loss)]
pub fn average_duration(builds: &[BuildRecord]) -> f64 {
    let durations: Vec<u64> = builds
        .iter()
        .map(|b| b.duration)
        .filter(|d| *d > 0)
        .collect();

    if durations.is_empty() {
        return 0.0;
    }
    round2(durations.iter().sum::<u64>() as f64 / durations.len() as f64)
}

/// Buckets builds by the UTC day of their start timestamp.
///
/// Builds without a timestamp, or with one outside chrono's range, are skipped.
/// Buckets come back sorted by date ascending.
#[allow(clippy::cast_precision_loss)]
pub fn daily_trends<'a>(builds: impl IntoIterator<Item = &'a BuildRecord>) -> Vec<TrendBucket> {
    #[derive(Default)]
    struct Day {
        success: usize,
        failure: usize,
        total: usize,
        duration: u64,
    }

    let mut days: BTreeMap<String, Day> = BTreeMap::new();

    for build in builds {
        let Some(date) = build.timestamp.and_then(DateTime::<Utc>::from_timestamp_millis) else {
            continue;
        };

        let day = days.entry(date.format("%Y-%m-%d").to_string()).or_default();
        day.total += 1;
        day.duration += build.duration;
        if build.is_success() {
            day.success += 1;
        } else if build.is_failure() {
            day.failure += 1;
        }
    }

    days.into_iter()
        .map(|(date, day)| TrendBucket {
            date,
            success: day.success,
            failure: day.failure,
            total: day.total,
            success_rate: calculate_rate(day.success, day.total),
            average_duration: round2(day.duration as f64 / day.total as f64),
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{BuildRef, PipelineRef};

    const DAY1: i64 = 1_714_557_600_000; // 2024-05-01T10:00:00Z
    const DAY2: i64 = DAY1 + 86_400_000;

    fn build(number: u64, status: Option<BuildStatus>, duration: u64, timestamp: Option<i64>) -> BuildRecord {
        let pipeline = PipelineRef::Jenkins {
            job: "api".to_string(),
        };
        BuildRecord {
            id: pipeline.build(number),
            pipeline,
            vendor: Vendor::Jenkins,
            name: None,
            status,
            duration,
            timestamp,
            url: None,
            logs: None,
        }
    }

    #[test]
    fn rate_is_rounded_to_two_decimals() {
        assert_eq!(calculate_rate(1, 3), 33.33);
        assert_eq!(calculate_rate(2, 3), 66.67);
        assert_eq!(calculate_rate(5, 5), 100.0);
    }

    #[test]
    fn rate_of_empty_set_is_zero() {
        assert_eq!(calculate_rate(0, 0), 0.0);
    }

    #[test]
    fn average_ignores_zero_durations() {
        let builds = vec![
            build(1, Some(BuildStatus::Success), 1000, None),
            build(2, Some(BuildStatus::Running), 0, None),
            build(3, Some(BuildStatus::Failure), 2001, None),
        ];
        assert_eq!(average_duration(&builds), 1500.5);
        assert_eq!(average_duration(&[]), 0.0);
    }

    #[test]
    fn trends_bucket_by_day_in_ascending_order() {
        let builds = vec![
            build(3, Some(BuildStatus::Success), 30, Some(DAY2)),
            build(1, Some(BuildStatus::Success), 10, Some(DAY1)),
            build(2, Some(BuildStatus::Failure), 20, Some(DAY1 + 3_600_000)),
        ];

        let trends = daily_trends(&builds);

        assert_eq!(
            trends,
            vec![
                TrendBucket {
                    date: "2024-05-01".to_string(),
                    success: 1,
                    failure: 1,
                    total: 2,
                    success_rate: 50.0,
                    average_duration: 15.0,
                },
                TrendBucket {
                    date: "2024-05-02".to_string(),
                    success: 1,
                    failure: 0,
                    total: 1,
                    success_rate: 100.0,
                    average_duration: 30.0,
                },
            ]
        );
    }

    #[test]
    fn trends_skip_unusable_timestamps() {
        let builds = vec![
            build(1, Some(BuildStatus::Success), 10, None),
            build(2, Some(BuildStatus::Failure), 10, Some(i64::MAX)),
            build(3, None, 40, Some(DAY1)),
        ];

        let trends = daily_trends(&builds);

        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].total, 1);
        assert_eq!(trends[0].success, 0);
        assert_eq!(trends[0].failure, 0);
        assert_eq!(trends[0].average_duration, 40.0);
    }

    #[test]
    fn vendor_stats_count_each_outcome() {
        let builds = vec![
            build(1, Some(BuildStatus::Success), 100, None),
            build(2, Some(BuildStatus::Failure), 300, None),
            build(3, Some(BuildStatus::Running), 0, None),
            build(4, Some(BuildStatus::Success), 200, None),
        ];

        let stats = VendorStats::from_builds(2, &builds);

        assert_eq!(stats.pipelines, 2);
        assert_eq!(stats.builds, 4);
        assert_eq!(stats.successful, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.running, 1);
        assert_eq!(stats.success_rate, 50.0);
        assert_eq!(stats.failure_rate, 25.0);
        assert_eq!(stats.average_duration, 200.0);
    }
}
