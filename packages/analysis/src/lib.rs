#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Offline analysis over normalized 311 requests and social posts.
//!
//! [`run`] is the single entry point: it buckets requests onto the
//! spatial grid, detects chronic hotspots and reporting gaps, rolls up
//! neighborhood and category statistics, and returns one
//! [`AnalysisResult`] ready to serialize. All stages are deterministic
//! for a given input and config; only the generated-at timestamp
//! varies between runs.

pub mod buckets;
pub mod categories;
pub mod gaps;
pub mod hotspots;
pub mod neighborhoods;
pub mod window;

mod util;

use chrono::{DateTime, Utc};
use infra_map_analysis_models::{
    AnalysisConfig, AnalysisResult, AnalysisSummary, DateRange,
};
use infra_map_report_models::{ServiceRequest, SocialPost};
use log::info;

/// Runs the full analysis pipeline at the current time.
///
/// `malformed_rows` is the count of feed rows the caller dropped while
/// reading; it is carried into the summary so the output records how
/// much input was discarded.
#[must_use]
pub fn run(
    requests: &[ServiceRequest],
    posts: &[SocialPost],
    config: &AnalysisConfig,
    malformed_rows: u64,
) -> AnalysisResult {
    run_at(requests, posts, config, malformed_rows, Utc::now())
}

/// Runs the pipeline with an explicit clock, for reproducible output.
#[must_use]
pub fn run_at(
    requests: &[ServiceRequest],
    posts: &[SocialPost],
    config: &AnalysisConfig,
    malformed_rows: u64,
    now: DateTime<Utc>,
) -> AnalysisResult {
    let buckets = buckets::BucketMap::build(requests, config.cells_per_degree);
    info!(
        "bucketed {} requests into {} cells ({} unmapped)",
        requests.len(),
        buckets.len(),
        buckets.unmapped
    );

    let hotspots = hotspots::detect(requests, &buckets, config);
    info!("detected {} chronic hotspots", hotspots.len());

    let gap_outcome = gaps::detect(requests, posts, config);
    info!("detected {} reporting gaps", gap_outcome.gaps.len());

    let neighborhoods = neighborhoods::summarize(requests, now);
    let category_stats = categories::recurrence_stats(requests, &hotspots);

    let date_range = requests
        .iter()
        .map(|r| r.created)
        .min()
        .zip(requests.iter().map(|r| r.created).max())
        .map(|(start, end)| DateRange { start, end });

    let summary = AnalysisSummary {
        total_requests: u64::try_from(requests.len()).unwrap_or(u64::MAX),
        total_posts: u64::try_from(posts.len()).unwrap_or(u64::MAX),
        malformed_rows,
        unmapped_requests: buckets.unmapped,
        unlocated_posts: gap_outcome.unlocated_posts,
        chronic_hotspots: u64::try_from(hotspots.len()).unwrap_or(u64::MAX),
        high_priority_hotspots: u64::try_from(
            hotspots.iter().filter(|h| h.high_priority).count(),
        )
        .unwrap_or(u64::MAX),
        neighborhoods_analyzed: u64::try_from(neighborhoods.len()).unwrap_or(u64::MAX),
        gap_neighborhoods: u64::try_from(gap_outcome.gaps.len()).unwrap_or(u64::MAX),
        date_range,
        generated_at: now,
    };

    AnalysisResult {
        summary,
        hotspots,
        gaps: gap_outcome.gaps,
        neighborhoods,
        category_stats,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Utc};
    use infra_map_report_models::{ServiceRequest, SocialPost};

    pub fn request_at(latitude: f64, longitude: f64, created: &str) -> ServiceRequest {
        ServiceRequest {
            request_num: format!("SR-{created}-{latitude}-{longitude}"),
            request_type: "Pothole Repair".into(),
            status: "Open".into(),
            created: created.parse().unwrap(),
            status_date: None,
            latitude,
            longitude,
            neighborhood: None,
            street: None,
        }
    }

    pub fn request_with(
        latitude: f64,
        longitude: f64,
        created: &str,
        status: &str,
        status_date: Option<&str>,
    ) -> ServiceRequest {
        let mut request = request_at(latitude, longitude, created);
        request.status = status.to_owned();
        request.status_date = status_date.map(|d| d.parse().unwrap());
        request
    }

    pub fn request_in_neighborhood(neighborhood: &str) -> ServiceRequest {
        request_in_neighborhood_at(neighborhood, "2024-01-05T00:00:00Z")
    }

    pub fn request_in_neighborhood_at(neighborhood: &str, created: &str) -> ServiceRequest {
        let mut request = request_at(39.29, -76.61, created);
        request.request_num = format!("SR-{neighborhood}-{created}");
        request.neighborhood = Some(neighborhood.to_owned());
        request
    }

    pub fn request_typed(request_type: &str) -> ServiceRequest {
        let mut request = request_at(39.29, -76.61, "2024-01-05T00:00:00Z");
        request.request_num = format!("SR-{request_type}");
        request.request_type = request_type.to_owned();
        request
    }

    pub fn post_with_hints(post_id: &str, hints: &[&str]) -> SocialPost {
        SocialPost {
            post_id: post_id.to_owned(),
            category: "pothole".into(),
            title: "Pothole swallowing tires".into(),
            text: "This keeps getting worse.".into(),
            url: format!("https://reddit.com/r/baltimore/{post_id}"),
            score: 10,
            num_comments: 3,
            created: fixed_date(),
            location_hints: hints.iter().map(|h| (*h).to_owned()).collect(),
            damage_intensity: 2,
            chronic_signal: false,
        }
    }

    fn fixed_date() -> DateTime<Utc> {
        "2024-03-01T00:00:00Z".parse().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::{post_with_hints, request_at, request_in_neighborhood_at};

    fn fixed_now() -> DateTime<Utc> {
        "2024-07-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn empty_input_produces_empty_result() {
        let result = run_at(&[], &[], &AnalysisConfig::default(), 0, fixed_now());
        assert_eq!(result.summary.total_requests, 0);
        assert_eq!(result.summary.date_range, None);
        assert!(result.hotspots.is_empty());
        assert!(result.gaps.is_empty());
        assert!(result.neighborhoods.is_empty());
        assert!(result.category_stats.is_empty());
    }

    #[test]
    fn end_to_end_counts_are_consistent() {
        let mut requests = vec![
            request_at(39.290, -76.610, "2024-01-05T00:00:00Z"),
            request_at(39.290, -76.610, "2024-02-10T00:00:00Z"),
            request_at(39.290, -76.610, "2024-03-20T00:00:00Z"),
            // Invalid coordinate: counted as unmapped, still analyzed
            // for neighborhood stats.
            request_at(0.0, 0.0, "2024-04-01T00:00:00Z"),
        ];
        requests.push(request_in_neighborhood_at("Hampden", "2024-05-01T00:00:00Z"));

        let posts: Vec<_> = (0..3)
            .map(|i| post_with_hints(&format!("p{i}"), &["cherry hill"]))
            .collect();

        let result = run_at(&requests, &posts, &AnalysisConfig::default(), 2, fixed_now());

        assert_eq!(result.summary.total_requests, 5);
        assert_eq!(result.summary.total_posts, 3);
        assert_eq!(result.summary.malformed_rows, 2);
        assert_eq!(result.summary.unmapped_requests, 1);
        assert_eq!(result.summary.chronic_hotspots, 1);
        assert_eq!(result.summary.gap_neighborhoods, 1);
        assert_eq!(result.gaps[0].neighborhood, "Cherry Hill");
        assert_eq!(result.summary.neighborhoods_analyzed, 1);

        let range = result.summary.date_range.unwrap();
        assert_eq!(range.start, "2024-01-05T00:00:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(range.end, "2024-05-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }
}
