//! Category recurrence statistics.
//!
//! Cross-references the full request feed with the detected hotspots
//! to estimate, per taxonomy category, how much of the workload is
//! repeat reports at chronic locations.

use std::collections::BTreeMap;

use infra_map_analysis_models::{CategoryStats, HotspotRecord};
use infra_map_report_models::{InfrastructureCategory, ServiceRequest};

use crate::util::round_to;

/// Builds per-category recurrence stats from the request feed and the
/// hotspots detected over it.
///
/// A hotspot's members are attributed to the category of its primary
/// request type. Output is sorted descending by recurrence percentage,
/// category name ascending on ties; categories with no requests are
/// omitted.
#[must_use]
pub fn recurrence_stats(
    requests: &[ServiceRequest],
    hotspots: &[HotspotRecord],
) -> Vec<CategoryStats> {
    let mut totals: BTreeMap<InfrastructureCategory, u64> = BTreeMap::new();
    for request in requests {
        *totals.entry(request.category()).or_default() += 1;
    }

    let mut at_chronic: BTreeMap<InfrastructureCategory, u64> = BTreeMap::new();
    let mut rereports: BTreeMap<InfrastructureCategory, u64> = BTreeMap::new();
    for hotspot in hotspots {
        let category = InfrastructureCategory::classify(&hotspot.primary_type);
        *at_chronic.entry(category).or_default() +=
            u64::try_from(hotspot.history.len()).unwrap_or(u64::MAX);
        *rereports.entry(category).or_default() += u64::try_from(
            hotspot.history.iter().filter(|entry| entry.is_rereport).count(),
        )
        .unwrap_or(u64::MAX);
    }

    #[allow(clippy::cast_precision_loss)]
    let mut stats: Vec<CategoryStats> = totals
        .into_iter()
        .map(|(category, total_requests)| {
            let chronic = at_chronic.get(&category).copied().unwrap_or(0);
            let repeated = rereports.get(&category).copied().unwrap_or(0);
            let total_f = total_requests.max(1) as f64;
            CategoryStats {
                category: category.to_string(),
                total_requests,
                at_chronic_locations: chronic,
                rereports: repeated,
                recurrence_pct: round_to(repeated as f64 / total_f * 100.0, 1),
                chronic_location_pct: round_to(chronic as f64 / total_f * 100.0, 1),
            }
        })
        .collect();

    stats.sort_by(|a, b| {
        b.recurrence_pct
            .partial_cmp(&a.recurrence_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use infra_map_analysis_models::ReportHistoryEntry;
    use crate::test_support::request_typed;

    fn hotspot_for(primary_type: &str, rereports: usize, total: usize) -> HotspotRecord {
        let history = (0..total)
            .map(|i| ReportHistoryEntry {
                date: "2024-01-01T00:00:00Z".parse().unwrap(),
                status: "Closed".into(),
                request_type: primary_type.to_owned(),
                request_num: format!("SR-{i}"),
                resolution_days: None,
                is_rereport: i < rereports,
            })
            .collect();
        HotspotRecord {
            bucket: "391200:-766100".into(),
            latitude: 39.12,
            longitude: -76.61,
            report_count: u64::try_from(total).unwrap_or(u64::MAX),
            window_count: 2,
            first_report: "2024-01-01T00:00:00Z".parse().unwrap(),
            last_report: "2024-03-01T00:00:00Z".parse().unwrap(),
            span_days: 60,
            primary_type: primary_type.to_owned(),
            neighborhood: None,
            address_hint: None,
            status_breakdown: BTreeMap::new(),
            category_breakdown: BTreeMap::new(),
            median_resolution_days: None,
            severity_score: 0.0,
            failed_fixes: 0,
            high_priority: false,
            history,
        }
    }

    #[test]
    fn computes_recurrence_percentages() {
        let requests = vec![
            request_typed("Pothole Repair"),
            request_typed("Pothole Repair"),
            request_typed("Pothole Repair"),
            request_typed("Pothole Repair"),
            request_typed("Street Light Out"),
        ];
        let hotspots = vec![hotspot_for("Pothole Repair", 1, 3)];

        let stats = recurrence_stats(&requests, &hotspots);
        let pothole = stats.iter().find(|s| s.category == "POTHOLE").unwrap();
        assert_eq!(pothole.total_requests, 4);
        assert_eq!(pothole.at_chronic_locations, 3);
        assert_eq!(pothole.rereports, 1);
        assert!((pothole.recurrence_pct - 25.0).abs() < f64::EPSILON);
        assert!((pothole.chronic_location_pct - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sorts_by_recurrence_then_name() {
        let requests = vec![
            request_typed("Pothole Repair"),
            request_typed("Pothole Repair"),
            request_typed("Street Light Out"),
        ];
        let hotspots = vec![hotspot_for("Street Light Out", 1, 1)];

        let stats = recurrence_stats(&requests, &hotspots);
        assert_eq!(stats[0].category, "STREET_LIGHT");
        assert_eq!(stats[1].category, "POTHOLE");
    }

    #[test]
    fn no_hotspots_yields_zero_recurrence() {
        let requests = vec![request_typed("Pothole Repair")];
        let stats = recurrence_stats(&requests, &[]);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].at_chronic_locations, 0);
        assert!((stats[0].recurrence_pct - 0.0).abs() < f64::EPSILON);
    }
}
