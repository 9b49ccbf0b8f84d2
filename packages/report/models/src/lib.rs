#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Canonical record types for the infra-map pipeline.
//!
//! This crate defines the infrastructure request taxonomy plus the two
//! input record types every other crate consumes: [`ServiceRequest`]
//! (a Baltimore 311 service request) and [`SocialPost`] (an r/baltimore
//! post mentioning an infrastructure problem). Records are validated at
//! construction by the fetch/store layers and immutable afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Broad infrastructure request categories.
///
/// Baltimore's 311 system has dozens of free-text `SRType` values; this
/// taxonomy collapses them into the handful of buckets the analysis and
/// dashboard report on. Unrecognized types map to [`Self::Other`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum InfrastructureCategory {
    /// Road surface potholes
    Pothole,
    /// Street light outages and damage
    StreetLight,
    /// Alley surface and drainage problems
    Alley,
    /// Broken or hazardous sidewalks
    Sidewalk,
    /// Water main breaks and leaks
    WaterMain,
    /// Road cave-ins and sinkholes
    CaveIn,
    /// Storm drains and catch basins
    StormDrain,
    /// Street, curb, and bridge damage not covered above
    StreetCurb,
    /// Anything else that matched an infrastructure keyword
    Other,
}

impl InfrastructureCategory {
    /// Maps a raw 311 `SRType` string to its category.
    ///
    /// Matching is case-insensitive substring matching, in priority
    /// order — "Street Light Out" must hit [`Self::StreetLight`] before
    /// the generic "street" test catches it.
    #[must_use]
    pub fn classify(sr_type: &str) -> Self {
        let t = sr_type.to_lowercase();
        if t.is_empty() {
            Self::Other
        } else if t.contains("pothole") {
            Self::Pothole
        } else if t.contains("light") {
            Self::StreetLight
        } else if t.contains("alley") {
            Self::Alley
        } else if t.contains("sidewalk") {
            Self::Sidewalk
        } else if t.contains("water") || t.contains("main") {
            Self::WaterMain
        } else if t.contains("cave") || t.contains("sinkhole") {
            Self::CaveIn
        } else if t.contains("storm") || t.contains("drain") || t.contains("catch") {
            Self::StormDrain
        } else if t.contains("curb") || t.contains("bridge") || t.contains("street") {
            Self::StreetCurb
        } else {
            Self::Other
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Pothole,
            Self::StreetLight,
            Self::Alley,
            Self::Sidewalk,
            Self::WaterMain,
            Self::CaveIn,
            Self::StormDrain,
            Self::StreetCurb,
            Self::Other,
        ]
    }
}

/// A single Baltimore 311 service request.
///
/// Constructed by the fetch/store layers with coordinates and timestamps
/// already validated; the analysis step treats these as read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequest {
    /// Service request number (e.g. `"25-00012345"`).
    pub request_num: String,
    /// Raw 311 service request type (e.g. `"Pothole Repair"`).
    pub request_type: String,
    /// Raw status string (`"Open"`, `"Closed"`, ...).
    pub status: String,
    /// When the request was filed.
    pub created: DateTime<Utc>,
    /// When the status last changed (closure date for closed requests).
    pub status_date: Option<DateTime<Utc>>,
    /// Point latitude (WGS84).
    pub latitude: f64,
    /// Point longitude (WGS84).
    pub longitude: f64,
    /// Neighborhood name, title-cased, if the city attributed one.
    pub neighborhood: Option<String>,
    /// Street address hint, if present.
    pub street: Option<String>,
}

impl ServiceRequest {
    /// Returns the taxonomy category for this request's type.
    #[must_use]
    pub fn category(&self) -> InfrastructureCategory {
        InfrastructureCategory::classify(&self.request_type)
    }

    /// Returns `true` if the request has been closed out.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status.to_lowercase().contains("closed")
    }

    /// Days between creation and the last status change, for closed
    /// requests. Negative spans (bad data) are reported as `None`.
    #[must_use]
    pub fn resolution_days(&self) -> Option<i64> {
        if !self.is_closed() {
            return None;
        }
        let days = (self.status_date? - self.created).num_days();
        (days >= 0).then_some(days)
    }
}

/// An r/baltimore post that matched an infrastructure search query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialPost {
    /// Reddit post ID (base36, e.g. `"1abcd2"`).
    pub post_id: String,
    /// Search category that surfaced the post (e.g. `"pothole"`).
    pub category: String,
    /// Post title.
    pub title: String,
    /// Post body, truncated to 1000 chars at fetch time.
    pub text: String,
    /// Permalink URL.
    pub url: String,
    /// Reddit score (upvotes minus downvotes).
    pub score: i64,
    /// Comment count at fetch time.
    pub num_comments: u64,
    /// Post creation time (UTC).
    pub created: DateTime<Utc>,
    /// Street and neighborhood mentions extracted from the text.
    pub location_hints: Vec<String>,
    /// Heuristic damage severity, 1 (mild gripe) to 5 (damage claimed).
    pub damage_intensity: u8,
    /// True when the text suggests a long-standing, repeatedly reported
    /// problem ("same pothole for years", "still not fixed").
    pub chronic_signal: bool,
}

impl SocialPost {
    /// Returns `true` if any location hint was extracted — posts
    /// without one cannot participate in the gap analysis.
    #[must_use]
    pub fn has_location(&self) -> bool {
        !self.location_hints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_types() {
        assert_eq!(
            InfrastructureCategory::classify("Pothole Repair"),
            InfrastructureCategory::Pothole
        );
        assert_eq!(
            InfrastructureCategory::classify("Street Light Out Investigation"),
            InfrastructureCategory::StreetLight
        );
        assert_eq!(
            InfrastructureCategory::classify("SW Cleaning - Storm Drain / Inlet"),
            InfrastructureCategory::StormDrain
        );
        assert_eq!(
            InfrastructureCategory::classify("Water Main Break"),
            InfrastructureCategory::WaterMain
        );
        assert_eq!(
            InfrastructureCategory::classify("Street - Damaged Curb"),
            InfrastructureCategory::StreetCurb
        );
    }

    #[test]
    fn light_beats_generic_street() {
        // "Street Light Out" contains "street" too; priority order matters.
        assert_eq!(
            InfrastructureCategory::classify("Street Light Out"),
            InfrastructureCategory::StreetLight
        );
    }

    #[test]
    fn unknown_types_map_to_other() {
        assert_eq!(
            InfrastructureCategory::classify("Rat Abatement"),
            InfrastructureCategory::Other
        );
        assert_eq!(InfrastructureCategory::classify(""), InfrastructureCategory::Other);
    }

    fn request(status: &str, created: &str, status_date: Option<&str>) -> ServiceRequest {
        ServiceRequest {
            request_num: "25-00000001".to_owned(),
            request_type: "Pothole Repair".to_owned(),
            status: status.to_owned(),
            created: created.parse().unwrap(),
            status_date: status_date.map(|s| s.parse().unwrap()),
            latitude: 39.29,
            longitude: -76.61,
            neighborhood: None,
            street: None,
        }
    }

    #[test]
    fn resolution_days_for_closed_requests() {
        let req = request(
            "Closed",
            "2024-01-05T00:00:00Z",
            Some("2024-01-15T00:00:00Z"),
        );
        assert_eq!(req.resolution_days(), Some(10));
    }

    #[test]
    fn no_resolution_days_when_open_or_inverted() {
        let open = request("Open", "2024-01-05T00:00:00Z", None);
        assert_eq!(open.resolution_days(), None);

        // Status date before creation: bad data, not a negative duration.
        let inverted = request(
            "Closed",
            "2024-01-15T00:00:00Z",
            Some("2024-01-05T00:00:00Z"),
        );
        assert_eq!(inverted.resolution_days(), None);
    }
}
