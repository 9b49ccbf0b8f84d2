#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! CLI entry point for the infra-map pipeline.
//!
//! Orchestrates the four stages as subcommands: fetch 311 requests,
//! fetch r/baltimore posts, run the analysis, and render the
//! dashboard. `run` chains all four. Each stage reads and writes flat
//! files under `data/` and `output/` at the workspace root, so stages
//! can be re-run independently.

mod progress;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use infra_map_analysis_models::AnalysisConfig;
use infra_map_source::arcgis::{self, Fetch311Options};
use infra_map_source::reddit::{self, FetchRedditOptions, RedditCredentials};

#[derive(Parser)]
#[command(name = "infra_map_cli", about = "Baltimore infrastructure analysis pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch 311 service requests from Open Baltimore
    Fetch311 {
        /// Comma-separated calendar years to fetch (e.g., "2023,2024").
        /// Defaults to 2020 through the current layer year.
        #[arg(long)]
        years: Option<String>,
        /// Maximum total records to fetch (for testing)
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Fetch infrastructure posts from r/baltimore
    FetchReddit {
        /// Maximum posts per search query (Reddit caps at 100)
        #[arg(long, default_value = "100")]
        limit: u32,
    },
    /// Run hotspot and gap analysis over the fetched feeds
    Analyze {
        /// Path to a TOML config overriding the analysis thresholds
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Render the HTML dashboard from the analysis results
    Dashboard,
    /// Run the full pipeline: fetch both feeds, analyze, render
    Run {
        /// Maximum total 311 records to fetch (for testing)
        #[arg(long)]
        limit: Option<u64>,
        /// Path to a TOML config overriding the analysis thresholds
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Returns the workspace root directory, resolved at compile time from
/// `CARGO_MANIFEST_DIR` so output paths do not depend on the caller's
/// working directory.
///
/// # Panics
///
/// Panics if the project root cannot be resolved from
/// `CARGO_MANIFEST_DIR`.
#[must_use]
fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("Failed to find project root from CARGO_MANIFEST_DIR")
        .to_path_buf()
}

fn requests_path() -> PathBuf {
    project_root().join("data/311_requests.csv")
}

fn posts_path() -> PathBuf {
    project_root().join("data/reddit_posts.csv")
}

fn results_path() -> PathBuf {
    project_root().join("data/analysis_results.json")
}

fn dashboard_path() -> PathBuf {
    project_root().join("output/dashboard.html")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = progress::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch311 { years, limit } => {
            fetch_311(&multi, years.as_deref(), limit).await?;
        }
        Commands::FetchReddit { limit } => {
            fetch_reddit(&multi, limit).await?;
        }
        Commands::Analyze { config } => {
            analyze(config.as_deref())?;
        }
        Commands::Dashboard => {
            dashboard()?;
        }
        Commands::Run { limit, config } => {
            fetch_311(&multi, None, limit).await?;
            // A missing Reddit credential downgrades to 311-only
            // analysis rather than failing the whole pipeline.
            if let Err(e) = fetch_reddit(&multi, 100).await {
                log::warn!("Skipping Reddit fetch: {e}");
            }
            analyze(config.as_deref())?;
            dashboard()?;
        }
    }

    Ok(())
}

async fn fetch_311(
    multi: &progress::MultiProgress,
    years: Option<&str>,
    limit: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let years = match years {
        Some(list) => list
            .split(',')
            .map(|y| y.trim().parse::<u16>())
            .collect::<Result<Vec<_>, _>>()?,
        None => arcgis::DEFAULT_YEARS.to_vec(),
    };

    let bar = progress::step_spinner(multi, "Fetching 311 service requests...");
    let requests = arcgis::fetch_311(&Fetch311Options { years, limit }).await?;
    bar.finish_with_message(format!("Fetched {} service requests", requests.len()));

    let path = requests_path();
    infra_map_store::write_requests_csv(&path, &requests)?;
    log::info!("Wrote {} requests to {}", requests.len(), path.display());
    Ok(())
}

async fn fetch_reddit(
    multi: &progress::MultiProgress,
    limit: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let credentials = RedditCredentials::from_env()?;

    let bar = progress::step_spinner(multi, "Fetching r/baltimore posts...");
    let posts = reddit::fetch_reddit(
        &credentials,
        &FetchRedditOptions {
            limit_per_query: limit,
        },
    )
    .await?;
    bar.finish_with_message(format!("Fetched {} posts", posts.len()));

    let path = posts_path();
    infra_map_store::write_posts_csv(&path, &posts)?;
    log::info!("Wrote {} posts to {}", posts.len(), path.display());
    Ok(())
}

fn analyze(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config_path {
        Some(path) => AnalysisConfig::from_toml_path(path)?,
        None => AnalysisConfig::default(),
    };

    let requests_file = requests_path();
    if !requests_file.exists() {
        return Err(format!(
            "No 311 data at {} — run `fetch-311` first",
            requests_file.display()
        )
        .into());
    }
    let requests = infra_map_store::read_requests_csv(&requests_file)?;

    // The Reddit feed is optional; without it the gap analysis is
    // simply empty.
    let posts_file = posts_path();
    let posts = if posts_file.exists() {
        infra_map_store::read_posts_csv(&posts_file)?
    } else {
        log::warn!(
            "No Reddit data at {} — gap analysis will be empty",
            posts_file.display()
        );
        infra_map_store::ReadOutcome {
            records: Vec::new(),
            skipped: 0,
        }
    };

    let malformed_rows = requests.skipped + posts.skipped;
    if malformed_rows > 0 {
        log::warn!("Skipped {malformed_rows} malformed feed rows");
    }

    let result = infra_map_analysis::run(&requests.records, &posts.records, &config, malformed_rows);
    log::info!(
        "Analysis complete: {} hotspots ({} high priority), {} gap neighborhoods",
        result.summary.chronic_hotspots,
        result.summary.high_priority_hotspots,
        result.summary.gap_neighborhoods
    );

    let path = results_path();
    infra_map_store::write_analysis_json(&path, &result)?;
    log::info!("Wrote analysis results to {}", path.display());
    Ok(())
}

fn dashboard() -> Result<(), Box<dyn std::error::Error>> {
    let results_file = results_path();
    if !results_file.exists() {
        return Err(format!(
            "No analysis results at {} — run `analyze` first",
            results_file.display()
        )
        .into());
    }

    let result = infra_map_store::read_analysis_json(&results_file)?;
    let path = dashboard_path();
    infra_map_generate::write_dashboard(&result, &path)?;
    println!("Dashboard written to {}", path.display());
    Ok(())
}
