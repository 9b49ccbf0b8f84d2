//! Reporting-gap detection.
//!
//! The equity lens of the analysis: neighborhoods where people are
//! clearly frustrated on social media but not filing 311 requests,
//! suggesting a reporting barrier rather than an absence of problems.
//!
//! Posts carry free-text location hints rather than coordinates, so
//! the join key is the neighborhood name. Hints are matched against
//! both the neighborhoods seen in the 311 data and a canonical list of
//! Baltimore neighborhoods, so an area with social chatter and *zero*
//! official reports still surfaces.

use std::collections::{BTreeMap, BTreeSet};

use infra_map_analysis_models::{AnalysisConfig, GapRecord};
use infra_map_report_models::{ServiceRequest, SocialPost};

use crate::util::round_to;

/// Baltimore-area neighborhoods recognized as gap join keys even when
/// no 311 request mentions them.
const KNOWN_NEIGHBORHOODS: &[&str] = &[
    "Canton",
    "Fells Point",
    "Federal Hill",
    "Hampden",
    "Charles Village",
    "Waverly",
    "Reservoir Hill",
    "Bolton Hill",
    "Mount Vernon",
    "Roland Park",
    "Guilford",
    "Homeland",
    "Remington",
    "Pigtown",
    "Cherry Hill",
    "Brooklyn",
    "Dundalk",
    "Catonsville",
    "Towson",
    "Parkville",
    "Overlea",
];

/// The gap records plus the count of posts that could not participate.
#[derive(Debug)]
pub struct GapOutcome {
    /// Qualifying gap neighborhoods, descending by gap score.
    pub gaps: Vec<GapRecord>,
    /// Posts with no resolvable location, excluded from the join.
    pub unlocated_posts: u64,
}

/// Finds neighborhoods whose social signal substantially outpaces
/// their official 311 volume.
///
/// A neighborhood qualifies when it drew at least
/// `min_social_mentions` posts and its 311-to-social ratio is below
/// `gap_ratio_threshold`.
#[must_use]
pub fn detect(
    requests: &[ServiceRequest],
    posts: &[SocialPost],
    config: &AnalysisConfig,
) -> GapOutcome {
    // 311 volume per neighborhood.
    let mut request_counts: BTreeMap<String, u64> = BTreeMap::new();
    for request in requests {
        if let Some(neighborhood) = &request.neighborhood {
            *request_counts.entry(neighborhood.clone()).or_default() += 1;
        }
    }

    // Join universe: neighborhoods seen in the 311 data plus the
    // canonical list, so zero-311 areas are still matchable.
    let universe: BTreeSet<String> = request_counts
        .keys()
        .cloned()
        .chain(KNOWN_NEIGHBORHOODS.iter().map(|&n| n.to_owned()))
        .collect();

    // Social signal per neighborhood. A post counts once per
    // neighborhood no matter how many of its hints matched.
    let mut social_counts: BTreeMap<&str, u64> = BTreeMap::new();
    let mut unlocated_posts: u64 = 0;

    for post in posts {
        if !post.has_location() {
            unlocated_posts += 1;
            continue;
        }

        let mut matched: BTreeSet<&str> = BTreeSet::new();
        for hint in &post.location_hints {
            let hint_lower = hint.to_lowercase();
            for neighborhood in &universe {
                let neighborhood_lower = neighborhood.to_lowercase();
                if neighborhood_lower.contains(&hint_lower)
                    || hint_lower.contains(&neighborhood_lower)
                {
                    matched.insert(neighborhood.as_str());
                }
            }
        }
        for neighborhood in matched {
            *social_counts.entry(neighborhood).or_default() += 1;
        }
    }

    let mut gaps: Vec<GapRecord> = Vec::new();

    #[allow(clippy::cast_precision_loss)]
    for (neighborhood, &social_posts) in &social_counts {
        if social_posts < config.min_social_mentions {
            continue;
        }
        let matched_requests = request_counts.get(*neighborhood).copied().unwrap_or(0);

        let ratio = matched_requests as f64 / social_posts as f64;
        if ratio >= config.gap_ratio_threshold {
            continue;
        }

        gaps.push(GapRecord {
            neighborhood: (*neighborhood).to_owned(),
            social_posts,
            matched_requests,
            ratio: round_to(ratio, 2),
            gap_score: round_to(social_posts as f64 / (matched_requests.max(1) as f64), 2),
        });
    }

    gaps.sort_by(|a, b| {
        b.gap_score
            .partial_cmp(&a.gap_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.neighborhood.cmp(&b.neighborhood))
    });

    GapOutcome {
        gaps,
        unlocated_posts,
    }
}
