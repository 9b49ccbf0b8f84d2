#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Flat-file persistence for the infra-map pipeline.
//!
//! Raw feeds are stored as CSV (`data/311_requests.csv`,
//! `data/reddit_posts.csv`) and the analysis output as JSON
//! (`data/analysis_results.json`). Every write overwrites the previous
//! run's file; there is no append mode and no other state.
//!
//! Reads validate each row at this boundary: malformed rows are
//! skipped and tallied, never propagated into the analysis.

use std::path::Path;

use chrono::{DateTime, Utc};
use infra_map_analysis_models::AnalysisResult;
use infra_map_report_models::{ServiceRequest, SocialPost};
use serde::{Deserialize, Serialize};

/// Errors that can occur reading or writing data files.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// File could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV file could not be opened or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization or parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A set of records read from a feed file, plus the count of malformed
/// rows that were skipped.
#[derive(Debug)]
pub struct ReadOutcome<T> {
    /// Successfully validated records.
    pub records: Vec<T>,
    /// Rows dropped because a field was missing or unparseable.
    pub skipped: u64,
}

/// One CSV row of the 311 feed. Dates are RFC 3339 strings; empty
/// strings mean absent.
#[derive(Debug, Serialize, Deserialize)]
struct RequestRow {
    request_num: String,
    request_type: String,
    status: String,
    created: String,
    status_date: String,
    latitude: f64,
    longitude: f64,
    neighborhood: String,
    street: String,
}

impl RequestRow {
    fn from_record(request: &ServiceRequest) -> Self {
        Self {
            request_num: request.request_num.clone(),
            request_type: request.request_type.clone(),
            status: request.status.clone(),
            created: request.created.to_rfc3339(),
            status_date: request
                .status_date
                .map(|d| d.to_rfc3339())
                .unwrap_or_default(),
            latitude: request.latitude,
            longitude: request.longitude,
            neighborhood: request.neighborhood.clone().unwrap_or_default(),
            street: request.street.clone().unwrap_or_default(),
        }
    }

    /// Validating conversion back into a [`ServiceRequest`]. `None`
    /// means the row is malformed and should be skipped.
    fn into_request(self) -> Option<ServiceRequest> {
        if self.request_num.is_empty() {
            return None;
        }
        let created = parse_rfc3339(&self.created)?;
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return None;
        }
        Some(ServiceRequest {
            request_num: self.request_num,
            request_type: self.request_type,
            status: self.status,
            created,
            status_date: parse_rfc3339(&self.status_date),
            latitude: self.latitude,
            longitude: self.longitude,
            neighborhood: non_empty(self.neighborhood),
            street: non_empty(self.street),
        })
    }
}

/// One CSV row of the Reddit feed. Location hints are stored as an
/// embedded JSON array, since CSV has no native list type.
#[derive(Debug, Serialize, Deserialize)]
struct PostRow {
    post_id: String,
    category: String,
    title: String,
    text: String,
    url: String,
    score: i64,
    num_comments: u64,
    created: String,
    location_hints: String,
    damage_intensity: u8,
    chronic_signal: bool,
}

impl PostRow {
    fn from_record(post: &SocialPost) -> Self {
        Self {
            post_id: post.post_id.clone(),
            category: post.category.clone(),
            title: post.title.clone(),
            text: post.text.clone(),
            url: post.url.clone(),
            score: post.score,
            num_comments: post.num_comments,
            created: post.created.to_rfc3339(),
            location_hints: serde_json::to_string(&post.location_hints).unwrap_or_else(|_| "[]".to_owned()),
            damage_intensity: post.damage_intensity,
            chronic_signal: post.chronic_signal,
        }
    }

    fn into_post(self) -> Option<SocialPost> {
        if self.post_id.is_empty() {
            return None;
        }
        let created = parse_rfc3339(&self.created)?;
        let location_hints: Vec<String> = serde_json::from_str(&self.location_hints).ok()?;
        Some(SocialPost {
            post_id: self.post_id,
            category: self.category,
            title: self.title,
            text: self.text,
            url: self.url,
            score: self.score,
            num_comments: self.num_comments,
            created,
            location_hints,
            damage_intensity: self.damage_intensity,
            chronic_signal: self.chronic_signal,
        })
    }
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Writes the 311 feed as CSV, overwriting any previous file.
///
/// # Errors
///
/// Returns [`StoreError`] if the file cannot be created or written.
pub fn write_requests_csv(path: &Path, requests: &[ServiceRequest]) -> Result<(), StoreError> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for request in requests {
        writer.serialize(RequestRow::from_record(request))?;
    }
    writer.flush()?;
    log::info!("wrote {} service requests to {}", requests.len(), path.display());
    Ok(())
}

/// Reads the 311 feed, skipping and tallying malformed rows.
///
/// # Errors
///
/// Returns [`StoreError`] if the file cannot be opened — a missing
/// feed file is a fatal boundary condition, unlike malformed rows.
pub fn read_requests_csv(path: &Path) -> Result<ReadOutcome<ServiceRequest>, StoreError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    let mut skipped: u64 = 0;

    for result in reader.deserialize::<RequestRow>() {
        match result.ok().and_then(RequestRow::into_request) {
            Some(request) => records.push(request),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!("skipped {skipped} malformed rows in {}", path.display());
    }
    Ok(ReadOutcome { records, skipped })
}

/// Writes the Reddit feed as CSV, overwriting any previous file.
///
/// # Errors
///
/// Returns [`StoreError`] if the file cannot be created or written.
pub fn write_posts_csv(path: &Path, posts: &[SocialPost]) -> Result<(), StoreError> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for post in posts {
        writer.serialize(PostRow::from_record(post))?;
    }
    writer.flush()?;
    log::info!("wrote {} posts to {}", posts.len(), path.display());
    Ok(())
}

/// Reads the Reddit feed, skipping and tallying malformed rows.
///
/// # Errors
///
/// Returns [`StoreError`] if the file cannot be opened.
pub fn read_posts_csv(path: &Path) -> Result<ReadOutcome<SocialPost>, StoreError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    let mut skipped: u64 = 0;

    for result in reader.deserialize::<PostRow>() {
        match result.ok().and_then(PostRow::into_post) {
            Some(post) => records.push(post),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!("skipped {skipped} malformed rows in {}", path.display());
    }
    Ok(ReadOutcome { records, skipped })
}

/// Writes the analysis result as pretty-printed JSON, overwriting any
/// previous run's output.
///
/// # Errors
///
/// Returns [`StoreError`] if serialization or the write fails.
pub fn write_analysis_json(path: &Path, result: &AnalysisResult) -> Result<(), StoreError> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(path, json)?;
    log::info!("wrote analysis results to {}", path.display());
    Ok(())
}

/// Reads a previously written analysis result.
///
/// # Errors
///
/// Returns [`StoreError`] if the file cannot be read or parsed.
pub fn read_analysis_json(path: &Path) -> Result<AnalysisResult, StoreError> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(num: &str) -> ServiceRequest {
        ServiceRequest {
            request_num: num.to_owned(),
            request_type: "Pothole Repair".to_owned(),
            status: "Closed".to_owned(),
            created: "2024-01-05T12:00:00Z".parse().unwrap(),
            status_date: Some("2024-01-12T12:00:00Z".parse().unwrap()),
            latitude: 39.2904,
            longitude: -76.6122,
            neighborhood: Some("Hampden".to_owned()),
            street: None,
        }
    }

    fn post(id: &str) -> SocialPost {
        SocialPost {
            post_id: id.to_owned(),
            category: "pothole".to_owned(),
            title: "Pothole on Falls Rd".to_owned(),
            text: "Same pothole, for years".to_owned(),
            url: "https://reddit.com/r/baltimore/1".to_owned(),
            score: 42,
            num_comments: 7,
            created: "2024-02-10T00:00:00Z".parse().unwrap(),
            location_hints: vec!["falls rd".to_owned(), "hampden".to_owned()],
            damage_intensity: 3,
            chronic_signal: true,
        }
    }

    #[test]
    fn requests_survive_a_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("311_requests.csv");

        let original = vec![request("24-1"), request("24-2")];
        write_requests_csv(&path, &original).unwrap();

        let outcome = read_requests_csv(&path).unwrap();
        assert_eq!(outcome.records, original);
        assert_eq!(outcome.skipped, 0);
    }

    #[test]
    fn posts_survive_a_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reddit_posts.csv");

        let original = vec![post("a1"), post("a2")];
        write_posts_csv(&path, &original).unwrap();

        let outcome = read_posts_csv(&path).unwrap();
        assert_eq!(outcome.records, original);
        assert_eq!(outcome.skipped, 0);
    }

    #[test]
    fn malformed_rows_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("311_requests.csv");

        write_requests_csv(&path, &[request("24-1")]).unwrap();

        // Append a row with an unparseable date and one with garbage coords.
        let mut contents = std::fs::read_to_string(&path).unwrap();
        contents.push_str("24-2,Pothole Repair,Open,not-a-date,,39.29,-76.61,,\n");
        contents.push_str("24-3,Pothole Repair,Open,2024-01-05T12:00:00Z,,not-a-number,-76.61,,\n");
        std::fs::write(&path, contents).unwrap();

        let outcome = read_requests_csv(&path).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.skipped, 2);
    }

    #[test]
    fn missing_feed_file_is_an_error() {
        assert!(read_requests_csv(Path::new("/nonexistent/feed.csv")).is_err());
    }

    #[test]
    fn empty_optional_fields_round_trip_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("311_requests.csv");

        let mut original = request("24-1");
        original.status_date = None;
        original.neighborhood = None;

        write_requests_csv(&path, std::slice::from_ref(&original)).unwrap();
        let outcome = read_requests_csv(&path).unwrap();
        assert_eq!(outcome.records[0], original);
    }
}
