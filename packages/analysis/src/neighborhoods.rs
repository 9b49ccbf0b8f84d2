//! Per-neighborhood 311 rollups.
//!
//! Raw counts favor big neighborhoods; the rollup adds resolution rate,
//! median time-to-close, and a recent-vs-prior 90-day trend so the
//! dashboard can show direction as well as volume.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use infra_map_analysis_models::NeighborhoodSummary;
use infra_map_report_models::ServiceRequest;

use crate::util::{median, round_to};

/// Summarizes requests by neighborhood. `now` anchors the trend
/// windows (recent 90 days vs the 90 before).
///
/// Output is sorted descending by total reports, name ascending on
/// ties. Requests without a neighborhood attribution are skipped.
#[must_use]
pub fn summarize(requests: &[ServiceRequest], now: DateTime<Utc>) -> Vec<NeighborhoodSummary> {
    let mut groups: BTreeMap<&str, Vec<&ServiceRequest>> = BTreeMap::new();
    for request in requests {
        if let Some(neighborhood) = &request.neighborhood {
            groups.entry(neighborhood.as_str()).or_default().push(request);
        }
    }

    let recent_cutoff = now - Duration::days(90);
    let prior_cutoff = now - Duration::days(180);

    let mut summaries: Vec<NeighborhoodSummary> = Vec::with_capacity(groups.len());

    #[allow(clippy::cast_precision_loss)]
    for (neighborhood, members) in groups {
        let total_reports = u64::try_from(members.len()).unwrap_or(u64::MAX);

        let mut type_breakdown: BTreeMap<String, u64> = BTreeMap::new();
        let mut closed: u64 = 0;
        let mut resolution_days: Vec<i64> = Vec::new();
        let mut recent: u64 = 0;
        let mut prior: u64 = 0;

        for member in &members {
            *type_breakdown
                .entry(member.request_type.clone())
                .or_default() += 1;
            if member.is_closed() {
                closed += 1;
                if let Some(days) = member.resolution_days() {
                    resolution_days.push(days);
                }
            }
            if member.created >= recent_cutoff {
                recent += 1;
            } else if member.created >= prior_cutoff {
                prior += 1;
            }
        }

        let resolution_rate_pct = (total_reports > 0)
            .then(|| round_to(closed as f64 / total_reports as f64 * 100.0, 1));

        let trend_pct = if prior > 0 {
            let recent_f = recent as f64;
            let prior_f = prior as f64;
            Some(round_to((recent_f - prior_f) / prior_f * 100.0, 1))
        } else if recent > 0 {
            Some(100.0)
        } else {
            None
        };

        summaries.push(NeighborhoodSummary {
            neighborhood: neighborhood.to_owned(),
            total_reports,
            type_breakdown,
            resolution_rate_pct,
            median_resolution_days: median(&mut resolution_days),
            recent_90_days: recent,
            prior_90_days: prior,
            trend_pct,
        });
    }

    summaries.sort_by(|a, b| {
        b.total_reports
            .cmp(&a.total_reports)
            .then_with(|| a.neighborhood.cmp(&b.neighborhood))
    });

    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{request_in_neighborhood, request_in_neighborhood_at};

    fn fixed_now() -> DateTime<Utc> {
        "2024-07-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn groups_and_sorts_by_volume() {
        let requests = vec![
            request_in_neighborhood("Hampden"),
            request_in_neighborhood("Hampden"),
            request_in_neighborhood("Canton"),
        ];

        let summaries = summarize(&requests, fixed_now());
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].neighborhood, "Hampden");
        assert_eq!(summaries[0].total_reports, 2);
        assert_eq!(summaries[1].neighborhood, "Canton");
    }

    #[test]
    fn trend_compares_recent_to_prior_window() {
        // 1 report in the prior 90 days, 2 in the recent 90.
        let requests = vec![
            request_in_neighborhood_at("Hampden", "2024-02-15T00:00:00Z"),
            request_in_neighborhood_at("Hampden", "2024-05-15T00:00:00Z"),
            request_in_neighborhood_at("Hampden", "2024-06-15T00:00:00Z"),
        ];

        let summaries = summarize(&requests, fixed_now());
        assert_eq!(summaries[0].recent_90_days, 2);
        assert_eq!(summaries[0].prior_90_days, 1);
        assert!((summaries[0].trend_pct.unwrap() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn trend_is_capped_sentinel_when_no_prior_activity() {
        let requests = vec![request_in_neighborhood_at("Hampden", "2024-06-15T00:00:00Z")];
        let summaries = summarize(&requests, fixed_now());
        assert_eq!(summaries[0].trend_pct, Some(100.0));

        // All activity older than 180 days: no trend at all.
        let stale = vec![request_in_neighborhood_at("Hampden", "2023-01-15T00:00:00Z")];
        let summaries = summarize(&stale, fixed_now());
        assert_eq!(summaries[0].trend_pct, None);
    }

    #[test]
    fn unattributed_requests_are_skipped() {
        let mut request = request_in_neighborhood("Hampden");
        request.neighborhood = None;
        assert!(summarize(&[request], fixed_now()).is_empty());
    }
}
