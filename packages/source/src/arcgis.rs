//! Open Baltimore 311 service request fetcher.
//!
//! Baltimore publishes 311 data through `ArcGIS` `FeatureServer`
//! endpoints, one layer per calendar year. Each layer is fetched with
//! offset pagination and filtered server-side to infrastructure-related
//! request types via a `SRType LIKE` where clause. Results are
//! normalized into [`ServiceRequest`] records; rows without usable
//! Baltimore coordinates are dropped here and tallied in the logs.

use std::collections::BTreeSet;

use infra_map_report_models::ServiceRequest;

use crate::{SourceError, parsing, retry};

/// Open Baltimore's `ArcGIS` organization ID.
const ARCGIS_ORG: &str = "UWYHeuuJISiGmgXx";

/// Max records per page. `ArcGIS` caps responses at its own
/// `maxRecordCount` (2000 for these layers) regardless of what we ask.
const PAGE_SIZE: u64 = 2000;

/// Years fetched by default. 2020-present gives enough history for
/// chronic-recurrence analysis; add earlier years for longer baselines.
pub const DEFAULT_YEARS: &[u16] = &[2026, 2025, 2024, 2023, 2022, 2021, 2020];

/// Infrastructure-related request types, matched with `SRType LIKE`.
const INFRASTRUCTURE_KEYWORDS: &[&str] = &[
    "Pothole",
    "Street Light",
    "Streetlight",
    "Sidewalk",
    "Alley",
    "Cave-In",
    "Sinkhole",
    "Water Main",
    "Storm Drain",
    "Catch Basin",
    "Bridge",
    "Curb",
    "Street - Damaged",
    "Street Light Out",
];

/// Configuration for a 311 fetch.
#[derive(Debug, Clone)]
pub struct Fetch311Options {
    /// Calendar years to fetch (each has its own layer).
    pub years: Vec<u16>,
    /// Maximum total records to fetch, across all years.
    pub limit: Option<u64>,
}

impl Default for Fetch311Options {
    fn default() -> Self {
        Self {
            years: DEFAULT_YEARS.to_vec(),
            limit: None,
        }
    }
}

fn query_url(year: u16) -> String {
    format!(
        "https://services1.arcgis.com/{ARCGIS_ORG}/arcgis/rest/services/311_Customer_Service_Requests_{year}/FeatureServer/0/query"
    )
}

/// Builds the `where` clause OR-ing a `LIKE` test per keyword.
fn build_where_clause() -> String {
    let conditions: Vec<String> = INFRASTRUCTURE_KEYWORDS
        .iter()
        .map(|kw| format!("SRType LIKE '%{kw}%'"))
        .collect();
    format!("({})", conditions.join(" OR "))
}

/// Queries one layer for its matching record count via
/// `returnCountOnly=true`. Returns `None` on failure (non-fatal, only
/// used for progress logging).
async fn query_count(client: &reqwest::Client, year: u16, where_clause: &str) -> Option<u64> {
    let url = query_url(year);
    let body = retry::send_json(|| {
        client.get(&url).query(&[
            ("where", where_clause),
            ("returnCountOnly", "true"),
            ("f", "json"),
        ])
    })
    .await
    .ok()?;
    body.get("count")?.as_u64()
}

/// Fetches infrastructure 311 requests for the configured years,
/// normalized and deduplicated on service request number.
///
/// A year whose layer is unreachable is skipped with a warning; rows
/// without valid Baltimore coordinates or a creation date are dropped
/// and tallied. Neither is fatal.
///
/// # Errors
///
/// Returns [`SourceError`] if the HTTP client cannot be built or a
/// request fails after all retries.
#[allow(clippy::too_many_lines)]
pub async fn fetch_311(options: &Fetch311Options) -> Result<Vec<ServiceRequest>, SourceError> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let where_clause = build_where_clause();
    let fetch_limit = options.limit.unwrap_or(u64::MAX);

    let mut requests: Vec<ServiceRequest> = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut dropped: u64 = 0;

    for &year in &options.years {
        let fetched = u64::try_from(requests.len()).unwrap_or(u64::MAX);
        if fetch_limit.saturating_sub(fetched) == 0 {
            break;
        }

        let total = query_count(&client, year, &where_clause).await;
        match total {
            Some(total) => log::info!("311 {year}: {total} matching records available"),
            None => {
                log::warn!("311 {year}: layer unreachable, skipping");
                continue;
            }
        }

        let url = query_url(year);
        let mut offset: u64 = 0;

        loop {
            let fetched = u64::try_from(requests.len()).unwrap_or(u64::MAX);
            let remaining = fetch_limit.saturating_sub(fetched);
            if remaining == 0 {
                break;
            }
            let page_limit = remaining.min(PAGE_SIZE);

            let offset_str = offset.to_string();
            let page_limit_str = page_limit.to_string();
            let body = retry::send_json(|| {
                client.get(&url).query(&[
                    ("where", where_clause.as_str()),
                    ("outFields", "*"),
                    ("returnGeometry", "true"),
                    ("outSR", "4326"),
                    ("f", "json"),
                    ("resultOffset", offset_str.as_str()),
                    ("resultRecordCount", page_limit_str.as_str()),
                ])
            })
            .await?;

            if let Some(error) = body.get("error") {
                log::warn!("311 {year}: ArcGIS error at offset {offset}: {error}");
                break;
            }

            let features = body
                .get("features")
                .and_then(serde_json::Value::as_array)
                .cloned()
                .unwrap_or_default();

            if features.is_empty() {
                break;
            }

            let page_count = u64::try_from(features.len()).unwrap_or(u64::MAX);
            for feature in &features {
                match normalize_feature(feature) {
                    Some(request) => {
                        if seen.insert(request.request_num.clone()) {
                            requests.push(request);
                        }
                    }
                    None => dropped += 1,
                }
            }

            log::info!("311 {year}: {} usable records so far", requests.len());

            offset += page_count;

            // `exceededTransferLimit: true` is the canonical "more pages
            // exist" signal; `count < page_limit` is unreliable because
            // the server silently caps results at its own maxRecordCount.
            let exceeded = body
                .get("exceededTransferLimit")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            if !exceeded {
                break;
            }
        }
    }

    log::info!(
        "311 fetch complete: {} records, {dropped} dropped (no coords, outside Baltimore, or no date)",
        requests.len()
    );

    Ok(requests)
}

/// Converts one `ArcGIS` feature into a [`ServiceRequest`].
///
/// Coordinates come from the feature geometry when present, falling
/// back to latitude/longitude attributes. Returns `None` when the
/// request number, creation date, or a valid Baltimore coordinate is
/// missing.
fn normalize_feature(feature: &serde_json::Value) -> Option<ServiceRequest> {
    let attributes = feature.get("attributes")?.as_object()?;
    let geometry = feature.get("geometry");

    let longitude = parsing::parse_coordinate(geometry.and_then(|g| g.get("x")))
        .or_else(|| parsing::parse_coordinate(parsing::attr(attributes, &["longitude"])))?;
    let latitude = parsing::parse_coordinate(geometry.and_then(|g| g.get("y")))
        .or_else(|| parsing::parse_coordinate(parsing::attr(attributes, &["latitude"])))?;

    if !infra_map_spatial::in_baltimore(latitude, longitude) {
        return None;
    }

    let request_num =
        parsing::attr_string(attributes, &["servicerequestnum", "srrecordid", "objectid"])?;
    let created = parsing::parse_arcgis_date(parsing::attr(attributes, &["createddate"])?)?;
    let status_date =
        parsing::attr(attributes, &["statusdate"]).and_then(parsing::parse_arcgis_date);

    Some(ServiceRequest {
        request_num,
        request_type: parsing::attr_string(attributes, &["srtype"]).unwrap_or_default(),
        status: parsing::attr_string(attributes, &["srstatus"]).unwrap_or_default(),
        created,
        status_date,
        latitude,
        longitude,
        neighborhood: parsing::attr_string(attributes, &["neighborhood"])
            .and_then(|n| parsing::normalize_neighborhood(&n)),
        street: parsing::attr_string(attributes, &["streetaddress", "street", "address"]),
    })
}
