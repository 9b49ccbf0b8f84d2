#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Data source fetchers for the infra-map pipeline.
//!
//! Two feeds: Baltimore City 311 service requests from the Open
//! Baltimore `ArcGIS` `FeatureServer` ([`arcgis`]), and r/baltimore
//! posts from the Reddit search API ([`reddit`]). Each fetcher
//! downloads, validates, and normalizes raw records into the canonical
//! types from `infra_map_report_models`; rows without usable
//! coordinates or relevance are dropped here, at the parse boundary.

pub mod arcgis;
pub mod parsing;
pub mod reddit;
pub mod retry;

/// Errors that can occur during data source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote API returned an application-level error.
    #[error("API error: {message}")]
    Api {
        /// Error message reported by the API.
        message: String,
    },

    /// A required credential environment variable is not set.
    #[error("missing credential: set the {var} environment variable")]
    MissingCredential {
        /// Name of the missing environment variable.
        var: &'static str,
    },
}
