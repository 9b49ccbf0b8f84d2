//! Chronic hotspot detection.
//!
//! A bucket qualifies as chronic when it has both enough total reports
//! and reports spread across enough distinct months — the second check
//! is what separates a recurring problem from one bad day of duplicate
//! filings.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Duration;
use infra_map_analysis_models::{AnalysisConfig, HotspotRecord, ReportHistoryEntry};
use infra_map_report_models::ServiceRequest;
use infra_map_spatial::CentroidAccumulator;

use crate::buckets::BucketMap;
use crate::util::{median, mode, round_to};
use crate::window::month_key;

/// Finds chronic hotspots among the bucketed requests.
///
/// Output is sorted descending by report count, ties broken by
/// earliest first report, then bucket key for full determinism.
#[must_use]
pub fn detect(
    requests: &[ServiceRequest],
    buckets: &BucketMap,
    config: &AnalysisConfig,
) -> Vec<HotspotRecord> {
    let mut hotspots: Vec<HotspotRecord> = Vec::new();

    for (key, member_indices) in buckets.iter() {
        let mut members: Vec<&ServiceRequest> =
            member_indices.iter().map(|&i| &requests[i]).collect();
        members.sort_by_key(|r| r.created);

        let report_count = u64::try_from(members.len()).unwrap_or(u64::MAX);
        if report_count < config.min_reports {
            continue;
        }

        let windows: BTreeSet<String> = members.iter().map(|r| month_key(&r.created)).collect();
        let window_count = u64::try_from(windows.len()).unwrap_or(u64::MAX);
        if window_count < config.min_windows {
            continue;
        }

        // Sorted by created, so first/last are the ends.
        let first_report = members[0].created;
        let last_report = members[members.len() - 1].created;
        let span_days = (last_report - first_report).num_days();

        let mut centroid = CentroidAccumulator::default();
        let mut status_breakdown: BTreeMap<String, u64> = BTreeMap::new();
        let mut category_breakdown: BTreeMap<String, u64> = BTreeMap::new();
        let mut resolution_days: Vec<i64> = Vec::new();

        for member in &members {
            centroid.push(member.latitude, member.longitude);
            *status_breakdown.entry(member.status.clone()).or_default() += 1;
            *category_breakdown
                .entry(member.category().to_string())
                .or_default() += 1;
            if let Some(days) = member.resolution_days() {
                resolution_days.push(days);
            }
        }

        // Members were validated by the bucket map, so the centroid
        // always exists here.
        let Some((latitude, longitude)) = centroid.finish() else {
            continue;
        };

        let history = build_history(&members, config.failed_fix_window_days);
        let failed_fixes = count_failed_fixes(&members, config.failed_fix_window_days);

        // Severity grows with volume and (logarithmically) with how
        // long the problem has persisted.
        #[allow(clippy::cast_precision_loss)]
        let months_span = (span_days as f64 / 30.0).max(1.0);
        #[allow(clippy::cast_precision_loss)]
        let severity_score = round_to(report_count as f64 * (1.0 + months_span.ln()), 1);

        let high_priority = report_count >= config.high_priority_reports || failed_fixes >= 2;

        hotspots.push(HotspotRecord {
            bucket: key.to_string(),
            latitude,
            longitude,
            report_count,
            window_count,
            first_report,
            last_report,
            span_days,
            primary_type: mode(members.iter().map(|r| r.request_type.as_str()))
                .unwrap_or("Unknown")
                .to_owned(),
            neighborhood: mode(members.iter().filter_map(|r| r.neighborhood.as_deref()))
                .map(str::to_owned),
            address_hint: mode(members.iter().filter_map(|r| r.street.as_deref()))
                .map(str::to_owned),
            status_breakdown,
            category_breakdown,
            median_resolution_days: median(&mut resolution_days),
            severity_score,
            failed_fixes,
            high_priority,
            history,
        });
    }

    hotspots.sort_by(|a, b| {
        b.report_count
            .cmp(&a.report_count)
            .then_with(|| a.first_report.cmp(&b.first_report))
            .then_with(|| a.bucket.cmp(&b.bucket))
    });

    hotspots
}

/// Builds the chronological report timeline for one bucket, flagging
/// reports filed within `failed_fix_window_days` of a prior closure.
///
/// `members` must already be sorted by creation time.
fn build_history(members: &[&ServiceRequest], failed_fix_window_days: i64) -> Vec<ReportHistoryEntry> {
    let mut history = Vec::with_capacity(members.len());
    let mut last_closure: Option<chrono::DateTime<chrono::Utc>> = None;

    for member in members {
        let is_rereport = last_closure.is_some_and(|closed_at| {
            let days_since = (member.created - closed_at).num_days();
            days_since > 0 && days_since <= failed_fix_window_days
        });

        history.push(ReportHistoryEntry {
            date: member.created,
            status: member.status.clone(),
            request_type: member.request_type.clone(),
            request_num: member.request_num.clone(),
            resolution_days: member.resolution_days(),
            is_rereport,
        });

        if member.is_closed()
            && let Some(status_date) = member.status_date
        {
            last_closure = Some(status_date);
        }
    }

    history
}

/// Counts closures followed by at least one new report within the
/// failed-fix window — the signal that a fix may not have held.
fn count_failed_fixes(members: &[&ServiceRequest], failed_fix_window_days: i64) -> u64 {
    let window = Duration::days(failed_fix_window_days);
    let mut failed_fixes: u64 = 0;

    for member in members {
        if !member.is_closed() {
            continue;
        }
        let Some(closed_at) = member.status_date else {
            continue;
        };
        let window_end = closed_at + window;

        let rereported = members
            .iter()
            .any(|other| other.created > closed_at && other.created <= window_end);
        if rereported {
            failed_fixes += 1;
        }
    }

    failed_fixes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{request_at, request_with};

    fn detect_default(requests: &[ServiceRequest]) -> Vec<HotspotRecord> {
        let config = AnalysisConfig::default();
        let buckets = BucketMap::build(requests, config.cells_per_degree);
        detect(requests, &buckets, &config)
    }

    #[test]
    fn three_reports_across_two_months_qualify() {
        // The canonical chronic case: same point, reported in January
        // and twice in February.
        let requests = vec![
            request_at(39.290, -76.610, "2024-01-05T00:00:00Z"),
            request_at(39.290, -76.610, "2024-02-10T00:00:00Z"),
            request_at(39.290, -76.610, "2024-02-20T00:00:00Z"),
        ];

        let hotspots = detect_default(&requests);
        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].report_count, 3);
        assert_eq!(hotspots[0].window_count, 2);
        assert_eq!(hotspots[0].first_report, requests[0].created);
        assert_eq!(hotspots[0].last_report, requests[2].created);
    }

    #[test]
    fn same_month_flood_does_not_qualify() {
        // Two reports in one month: fails both thresholds.
        let requests = vec![
            request_at(39.290, -76.610, "2024-02-05T00:00:00Z"),
            request_at(39.290, -76.610, "2024-02-20T00:00:00Z"),
        ];
        assert!(detect_default(&requests).is_empty());

        // Three reports in one month: passes min_reports, still fails
        // the distinct-window check.
        let flood = vec![
            request_at(39.290, -76.610, "2024-02-05T00:00:00Z"),
            request_at(39.290, -76.610, "2024-02-12T00:00:00Z"),
            request_at(39.290, -76.610, "2024-02-20T00:00:00Z"),
        ];
        assert!(detect_default(&flood).is_empty());
    }

    #[test]
    fn counts_and_windows_match_members() {
        let requests = vec![
            request_at(39.290, -76.610, "2024-01-05T00:00:00Z"),
            request_at(39.290, -76.610, "2024-02-10T00:00:00Z"),
            request_at(39.290, -76.610, "2024-03-20T00:00:00Z"),
            request_at(39.290, -76.610, "2024-03-25T00:00:00Z"),
        ];

        let hotspots = detect_default(&requests);
        assert_eq!(hotspots[0].report_count, 4);
        assert_eq!(hotspots[0].window_count, 3);
        assert_eq!(hotspots[0].history.len(), 4);
    }

    #[test]
    fn centroid_is_mean_of_member_coordinates() {
        let requests = vec![
            request_at(39.2902, -76.6104, "2024-01-05T00:00:00Z"),
            request_at(39.2904, -76.6102, "2024-02-10T00:00:00Z"),
            request_at(39.2906, -76.6100, "2024-03-20T00:00:00Z"),
        ];

        let hotspots = detect_default(&requests);
        assert!((hotspots[0].latitude - 39.2904).abs() < 1e-9);
        assert!((hotspots[0].longitude - -76.6102).abs() < 1e-9);
    }

    #[test]
    fn ordering_is_count_desc_then_first_seen() {
        let mut requests = Vec::new();
        // Bucket A: 4 reports starting in March.
        for date in [
            "2024-03-01T00:00:00Z",
            "2024-04-01T00:00:00Z",
            "2024-05-01T00:00:00Z",
            "2024-06-01T00:00:00Z",
        ] {
            requests.push(request_at(39.290, -76.610, date));
        }
        // Bucket B: 3 reports starting in January.
        for date in [
            "2024-01-01T00:00:00Z",
            "2024-02-01T00:00:00Z",
            "2024-03-01T00:00:00Z",
        ] {
            requests.push(request_at(39.310, -76.650, date));
        }
        // Bucket C: 3 reports starting in February (later than B).
        for date in [
            "2024-02-01T00:00:00Z",
            "2024-03-01T00:00:00Z",
            "2024-04-01T00:00:00Z",
        ] {
            requests.push(request_at(39.330, -76.700, date));
        }

        let hotspots = detect_default(&requests);
        assert_eq!(hotspots.len(), 3);
        assert_eq!(hotspots[0].report_count, 4);
        // B and C tie on count; B saw its first report earlier.
        assert_eq!(hotspots[1].first_report, "2024-01-01T00:00:00Z".parse::<chrono::DateTime<chrono::Utc>>().unwrap());
        assert_eq!(hotspots[2].first_report, "2024-02-01T00:00:00Z".parse::<chrono::DateTime<chrono::Utc>>().unwrap());
    }

    #[test]
    fn rereport_after_closure_is_flagged() {
        let requests = vec![
            request_with(
                39.290,
                -76.610,
                "2024-01-05T00:00:00Z",
                "Closed",
                Some("2024-01-20T00:00:00Z"),
            ),
            // Filed 21 days after the closure — inside the 120-day window.
            request_at(39.290, -76.610, "2024-02-10T00:00:00Z"),
            request_at(39.290, -76.610, "2024-03-10T00:00:00Z"),
        ];

        let hotspots = detect_default(&requests);
        assert_eq!(hotspots.len(), 1);
        let hotspot = &hotspots[0];
        assert!(!hotspot.history[0].is_rereport);
        assert!(hotspot.history[1].is_rereport);
        assert_eq!(hotspot.failed_fixes, 1);
    }

    #[test]
    fn report_long_after_closure_is_not_a_failed_fix() {
        let requests = vec![
            request_with(
                39.290,
                -76.610,
                "2023-01-05T00:00:00Z",
                "Closed",
                Some("2023-01-20T00:00:00Z"),
            ),
            // Over a year later: recurrence, but not a failed fix.
            request_at(39.290, -76.610, "2024-02-10T00:00:00Z"),
            request_at(39.290, -76.610, "2024-03-10T00:00:00Z"),
        ];

        let hotspots = detect_default(&requests);
        assert_eq!(hotspots[0].failed_fixes, 0);
        assert!(hotspots[0].history.iter().all(|h| !h.is_rereport));
    }

    #[test]
    fn two_failed_fixes_force_high_priority() {
        let requests = vec![
            request_with(
                39.290,
                -76.610,
                "2024-01-05T00:00:00Z",
                "Closed",
                Some("2024-01-20T00:00:00Z"),
            ),
            request_with(
                39.290,
                -76.610,
                "2024-02-10T00:00:00Z",
                "Closed",
                Some("2024-02-25T00:00:00Z"),
            ),
            request_at(39.290, -76.610, "2024-03-15T00:00:00Z"),
        ];

        let hotspots = detect_default(&requests);
        assert_eq!(hotspots[0].failed_fixes, 2);
        assert!(hotspots[0].high_priority);
    }

    #[test]
    fn empty_input_yields_no_hotspots() {
        assert!(detect_default(&[]).is_empty());
    }
}
