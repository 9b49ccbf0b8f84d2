#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Analysis configuration and derived result types.
//!
//! Everything the analysis step produces is defined here:
//! [`HotspotRecord`] and [`GapRecord`] (the two derived entities the
//! dashboard maps), neighborhood and category rollups, and the
//! [`AnalysisResult`] envelope written to `data/analysis_results.json`.
//! [`AnalysisConfig`] holds the tunable thresholds, each with a
//! documented default, overridable from a TOML file without code
//! changes.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tunable thresholds for the analysis step.
///
/// The defaults below are starting points, not a contract — every
/// value can be overridden from a TOML config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AnalysisConfig {
    /// Minimum total reports for a bucket to qualify as chronic.
    #[serde(default = "defaults::min_reports")]
    pub min_reports: u64,
    /// Minimum distinct calendar months a bucket must be reported in.
    ///
    /// This is what separates genuine recurrence from a single flood
    /// of same-day duplicate reports.
    #[serde(default = "defaults::min_windows")]
    pub min_windows: u64,
    /// Minimum social-media mentions for a neighborhood to be
    /// considered in the gap analysis.
    #[serde(default = "defaults::min_social_mentions")]
    pub min_social_mentions: u64,
    /// A neighborhood qualifies as a gap when its 311-to-social ratio
    /// falls below this value.
    #[serde(default = "defaults::gap_ratio_threshold")]
    pub gap_ratio_threshold: f64,
    /// Spatial grid resolution in cells per degree (~111 m per cell at
    /// 1000).
    #[serde(default = "defaults::cells_per_degree")]
    pub cells_per_degree: u32,
    /// A report filed within this many days of a closure at the same
    /// location counts as a possible failed fix.
    #[serde(default = "defaults::failed_fix_window_days")]
    pub failed_fix_window_days: i64,
    /// Report count at which a hotspot is flagged high priority.
    #[serde(default = "defaults::high_priority_reports")]
    pub high_priority_reports: u64,
}

mod defaults {
    pub const fn min_reports() -> u64 {
        3
    }
    pub const fn min_windows() -> u64 {
        2
    }
    pub const fn min_social_mentions() -> u64 {
        2
    }
    pub const fn gap_ratio_threshold() -> f64 {
        0.5
    }
    pub const fn cells_per_degree() -> u32 {
        1000
    }
    pub const fn failed_fix_window_days() -> i64 {
        120
    }
    pub const fn high_priority_reports() -> u64 {
        8
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_reports: defaults::min_reports(),
            min_windows: defaults::min_windows(),
            min_social_mentions: defaults::min_social_mentions(),
            gap_ratio_threshold: defaults::gap_ratio_threshold(),
            cells_per_degree: defaults::cells_per_degree(),
            failed_fix_window_days: defaults::failed_fix_window_days(),
            high_priority_reports: defaults::high_priority_reports(),
        }
    }
}

/// Errors loading an [`AnalysisConfig`] from a TOML file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid TOML for this config.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

impl AnalysisConfig {
    /// Loads thresholds from a TOML file. Missing keys keep their
    /// defaults, so a config file only needs the values it overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_toml_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

/// One report in a hotspot's chronological timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportHistoryEntry {
    /// When the report was filed.
    pub date: DateTime<Utc>,
    /// Raw 311 status at fetch time.
    pub status: String,
    /// Raw 311 request type.
    pub request_type: String,
    /// Service request number.
    pub request_num: String,
    /// Days from creation to closure, for closed requests.
    pub resolution_days: Option<i64>,
    /// True when this report was filed within the failed-fix window of
    /// a previous closure at the same location.
    pub is_rereport: bool,
}

/// A chronic hotspot: one spatial bucket with repeated reports across
/// multiple distinct months.
///
/// Invariant: `report_count >= min_reports` and
/// `window_count >= min_windows` for the config that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotRecord {
    /// Grid cell key (`"lat_cell:lng_cell"`).
    pub bucket: String,
    /// Centroid latitude of the member reports (not the cell corner).
    pub latitude: f64,
    /// Centroid longitude of the member reports.
    pub longitude: f64,
    /// Total reports in this bucket.
    pub report_count: u64,
    /// Distinct calendar months the bucket was reported in.
    pub window_count: u64,
    /// Earliest report.
    pub first_report: DateTime<Utc>,
    /// Latest report.
    pub last_report: DateTime<Utc>,
    /// Days between first and last report.
    pub span_days: i64,
    /// Most common raw request type in the bucket.
    pub primary_type: String,
    /// Most common neighborhood attribution, if any.
    pub neighborhood: Option<String>,
    /// Most common street address hint, if any.
    pub address_hint: Option<String>,
    /// Report counts per raw status string.
    pub status_breakdown: BTreeMap<String, u64>,
    /// Report counts per taxonomy category.
    pub category_breakdown: BTreeMap<String, u64>,
    /// Median resolution time of closed member requests, in days.
    pub median_resolution_days: Option<f64>,
    /// Chronic severity score: `reports * (1 + ln(span in months))`.
    pub severity_score: f64,
    /// Closures followed by a new report within the failed-fix window.
    pub failed_fixes: u64,
    /// High report volume or repeated failed fixes.
    pub high_priority: bool,
    /// Chronological per-report timeline for the dashboard view.
    pub history: Vec<ReportHistoryEntry>,
}

/// A neighborhood with social-media complaint volume but
/// disproportionately little 311 activity.
///
/// Invariant: `social_posts >= min_social_mentions` and
/// `ratio < gap_ratio_threshold` for the config that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapRecord {
    /// Neighborhood name (the join key).
    pub neighborhood: String,
    /// Posts whose location hints matched this neighborhood.
    pub social_posts: u64,
    /// 311 requests attributed to this neighborhood.
    pub matched_requests: u64,
    /// `matched_requests / social_posts` — low means under-reported.
    pub ratio: f64,
    /// `social_posts / max(matched_requests, 1)`, rounded to 2
    /// decimals — higher means a larger apparent reporting gap.
    pub gap_score: f64,
}

/// Aggregate 311 statistics for one neighborhood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborhoodSummary {
    /// Neighborhood name.
    pub neighborhood: String,
    /// Total reports attributed to the neighborhood.
    pub total_reports: u64,
    /// Report counts per raw request type.
    pub type_breakdown: BTreeMap<String, u64>,
    /// Percent of reports closed.
    pub resolution_rate_pct: Option<f64>,
    /// Median days-to-close for closed reports.
    pub median_resolution_days: Option<f64>,
    /// Reports in the 90 days before the analysis ran.
    pub recent_90_days: u64,
    /// Reports in the 90 days before that.
    pub prior_90_days: u64,
    /// Percent change from the prior to the recent window.
    pub trend_pct: Option<f64>,
}

/// Recurrence statistics for one taxonomy category.
///
/// Answers "out of all pothole requests, what share look like failed
/// fixes at chronic locations?".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    /// Taxonomy category name (`SCREAMING_SNAKE_CASE`).
    pub category: String,
    /// All requests in this category.
    pub total_requests: u64,
    /// Requests that fall inside a chronic hotspot.
    pub at_chronic_locations: u64,
    /// Hotspot requests flagged as re-reports after a closure.
    pub rereports: u64,
    /// `rereports / total_requests`, as a percentage.
    pub recurrence_pct: f64,
    /// `at_chronic_locations / total_requests`, as a percentage.
    pub chronic_location_pct: f64,
}

/// Inclusive date range of the analyzed reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// Earliest report creation time.
    pub start: DateTime<Utc>,
    /// Latest report creation time.
    pub end: DateTime<Utc>,
}

/// Headline counts for the dashboard and run logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    /// Service requests that entered the analysis.
    pub total_requests: u64,
    /// Social posts that entered the analysis.
    pub total_posts: u64,
    /// Malformed feed rows skipped at the read boundary.
    pub malformed_rows: u64,
    /// Requests excluded from clustering for lacking a valid
    /// in-bounds coordinate.
    pub unmapped_requests: u64,
    /// Posts excluded from gap analysis for lacking a location hint.
    pub unlocated_posts: u64,
    /// Qualifying chronic hotspots.
    pub chronic_hotspots: u64,
    /// Hotspots flagged high priority.
    pub high_priority_hotspots: u64,
    /// Neighborhoods with at least one attributed report.
    pub neighborhoods_analyzed: u64,
    /// Qualifying gap neighborhoods.
    pub gap_neighborhoods: u64,
    /// Date range of the analyzed reports, `None` for empty input.
    pub date_range: Option<DateRange>,
    /// When the analysis ran.
    pub generated_at: DateTime<Utc>,
}

/// The write-once output artifact of an analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Headline counts.
    pub summary: AnalysisSummary,
    /// Chronic hotspots, descending by report count.
    pub hotspots: Vec<HotspotRecord>,
    /// Gap neighborhoods, descending by gap score.
    pub gaps: Vec<GapRecord>,
    /// Per-neighborhood rollups, descending by total reports.
    pub neighborhoods: Vec<NeighborhoodSummary>,
    /// Per-category recurrence stats, descending by recurrence rate.
    pub category_stats: Vec<CategoryStats>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AnalysisConfig::default();
        assert_eq!(config.min_reports, 3);
        assert_eq!(config.min_windows, 2);
        assert_eq!(config.min_social_mentions, 2);
        assert!((config.gap_ratio_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.cells_per_degree, 1000);
        assert_eq!(config.failed_fix_window_days, 120);
        assert_eq!(config.high_priority_reports, 8);
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_keys() {
        let config: AnalysisConfig =
            toml::from_str("min_reports = 5\ngap_ratio_threshold = 0.25\n").unwrap();
        assert_eq!(config.min_reports, 5);
        assert!((config.gap_ratio_threshold - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.min_windows, 2);
        assert_eq!(config.cells_per_degree, 1000);
    }

    #[test]
    fn empty_toml_is_the_default_config() {
        let config: AnalysisConfig = toml::from_str("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn result_serializes_camel_case() {
        let record = GapRecord {
            neighborhood: "Cherry Hill".to_owned(),
            social_posts: 5,
            matched_requests: 0,
            ratio: 0.0,
            gap_score: 5.0,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("socialPosts").is_some());
        assert!(json.get("matchedRequests").is_some());
        assert!(json.get("gapScore").is_some());
    }
}
