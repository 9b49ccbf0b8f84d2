//! r/baltimore infrastructure post fetcher.
//!
//! Searches r/baltimore for posts matching infrastructure keyword
//! queries through Reddit's OAuth API (client-credentials grant, read
//! only). Each matching post is screened for Baltimore relevance, mined
//! for street/neighborhood mentions, and scored for damage intensity
//! before being normalized into a [`SocialPost`].

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::DateTime;
use infra_map_report_models::SocialPost;
use regex::Regex;

use crate::{SourceError, retry};

/// Search queries, grouped by infrastructure category.
const SEARCH_QUERIES: &[(&str, &[&str])] = &[
    (
        "pothole",
        &[
            "pothole",
            "potholes",
            "pothole damage",
            "hit a pothole",
            "tire pothole",
            "rim pothole",
        ],
    ),
    (
        "streetlight",
        &[
            "street light out",
            "streetlight out",
            "light out",
            "no street lights",
            "dark street",
        ],
    ),
    (
        "sidewalk",
        &[
            "broken sidewalk",
            "cracked sidewalk",
            "sidewalk damage",
            "tripped on sidewalk",
        ],
    ),
    (
        "flooding",
        &[
            "flooding street",
            "street flooding",
            "flooded road",
            "water main break",
            "water main",
        ],
    ),
    (
        "cave_in",
        &["cave in", "sinkhole", "road collapsed", "street collapsed"],
    ),
    ("alley", &["broken alley", "alley damage", "alley flooding"]),
];

/// City-wide signals that establish relevance but are too broad to be
/// useful as location hints.
const CITY_SIGNALS: &[&str] = &["baltimore", "bmore", "charm city", "balt", " md "];

/// Neighborhood and street names used both for relevance screening and
/// as extractable location hints.
const LOCATION_SIGNALS: &[&str] = &[
    // Neighborhoods
    "canton",
    "fells point",
    "federal hill",
    "hampden",
    "charles village",
    "waverly",
    "reservoir hill",
    "bolton hill",
    "mount vernon",
    "roland park",
    "guilford",
    "homeland",
    "remington",
    "pigtown",
    "cherry hill",
    "brooklyn",
    "dundalk",
    "catonsville",
    "towson",
    "parkville",
    "overlea",
    // Streets
    "northern pkwy",
    "cold spring",
    "reisterstown rd",
    "edmondson",
    "pulaski",
    "belair rd",
    "harford rd",
    "york rd",
    "falls rd",
    "roland ave",
    "charles st",
    "maryland ave",
    "calvert st",
    "st paul st",
    "eastern ave",
    "o'donnell",
    "boston st",
];

/// Patterns for pulling street/intersection mentions out of free text.
static STREET_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(\d+\s+(?:block\s+of\s+)?[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?\s+(?:St|Street|Ave|Avenue|Blvd|Boulevard|Rd|Road|Dr|Drive|Ln|Lane|Way|Pkwy|Parkway|Ct|Court|Pl|Place))\b",
        r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?\s+(?:St|Street|Ave|Avenue|Blvd|Boulevard|Rd|Road|Dr|Drive|Ln|Lane|Way|Pkwy|Parkway))\b",
        r"(?i)\b((?:corner|intersection|near|at|on)\s+(?:of\s+)?[A-Z][a-z]+(?:\s+(?:and|&|/)\s+[A-Z][a-z]+)?)\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("street pattern must compile"))
    .collect()
});

/// Words suggesting physical damage occurred.
const DAMAGE_WORDS: &[&str] = &[
    "damage",
    "damaged",
    "destroyed",
    "broke",
    "broken",
    "bent",
    "flat tire",
    "blowout",
    "bent rim",
    "alignment",
    "suspension",
    "repair bill",
    "mechanic",
    "tow truck",
    "totaled",
];

/// Words amplifying severity.
const SEVERE_WORDS: &[&str] = &[
    "horrible",
    "terrible",
    "dangerous",
    "hazard",
    "years",
    "months",
    "again",
    "still",
    "never fixed",
    "keeps",
    "every time",
    "always",
];

/// Signals of a chronic, repeatedly reported problem. Weighted double
/// in intensity scoring.
const CHRONIC_WORDS: &[&str] = &[
    "years",
    "every year",
    "same pothole",
    "same spot",
    "been reported",
    "reported before",
    "nothing done",
    "ignore",
    "unfixed",
    "still there",
];

/// Maximum body length kept per post.
const MAX_TEXT_LEN: usize = 1000;

/// Reddit API credentials, read from the environment.
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    client_id: String,
    client_secret: String,
    user_agent: String,
}

impl RedditCredentials {
    /// Reads `REDDIT_CLIENT_ID`, `REDDIT_CLIENT_SECRET`, and (optional)
    /// `REDDIT_USER_AGENT` from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingCredential`] naming the first
    /// missing variable.
    pub fn from_env() -> Result<Self, SourceError> {
        let require = |var: &'static str| {
            std::env::var(var)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or(SourceError::MissingCredential { var })
        };
        Ok(Self {
            client_id: require("REDDIT_CLIENT_ID")?,
            client_secret: require("REDDIT_CLIENT_SECRET")?,
            user_agent: std::env::var("REDDIT_USER_AGENT")
                .unwrap_or_else(|_| "infra-map:v0.1 (by /u/infra-map)".to_owned()),
        })
    }
}

/// Configuration for a Reddit fetch.
#[derive(Debug, Clone)]
pub struct FetchRedditOptions {
    /// Maximum posts requested per search query (Reddit caps at 100).
    pub limit_per_query: u32,
}

impl Default for FetchRedditOptions {
    fn default() -> Self {
        Self {
            limit_per_query: 100,
        }
    }
}

/// Fetches r/baltimore posts for every configured search query,
/// deduplicated on post ID (the same post often matches several
/// queries).
///
/// Individual query failures are logged and skipped; only credential
/// and token-exchange failures are fatal.
///
/// # Errors
///
/// Returns [`SourceError`] if the HTTP client cannot be built or the
/// OAuth token exchange fails.
pub async fn fetch_reddit(
    credentials: &RedditCredentials,
    options: &FetchRedditOptions,
) -> Result<Vec<SocialPost>, SourceError> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let token = fetch_access_token(&client, credentials).await?;

    let mut posts: Vec<SocialPost> = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut irrelevant: u64 = 0;

    for &(category, queries) in SEARCH_QUERIES {
        log::info!("reddit: searching category '{category}' ({} queries)", queries.len());
        for &query in queries {
            let limit = options.limit_per_query.to_string();
            let result = retry::send_json(|| {
                client
                    .get("https://oauth.reddit.com/r/baltimore/search")
                    .bearer_auth(&token)
                    .header(reqwest::header::USER_AGENT, &credentials.user_agent)
                    .query(&[
                        ("q", query),
                        ("restrict_sr", "1"),
                        ("sort", "new"),
                        ("t", "year"),
                        ("limit", limit.as_str()),
                    ])
            })
            .await;

            let body = match result {
                Ok(body) => body,
                Err(err) => {
                    log::warn!("reddit: query '{query}' failed: {err}");
                    continue;
                }
            };

            let children = body
                .pointer("/data/children")
                .and_then(serde_json::Value::as_array)
                .cloned()
                .unwrap_or_default();

            for child in &children {
                let Some(post) = normalize_post(child, category) else {
                    irrelevant += 1;
                    continue;
                };
                if seen.insert(post.post_id.clone()) {
                    posts.push(post);
                }
            }
        }
    }

    log::info!(
        "reddit fetch complete: {} unique posts ({irrelevant} screened out as not Baltimore-relevant)",
        posts.len()
    );

    Ok(posts)
}

/// Exchanges client credentials for an OAuth access token.
async fn fetch_access_token(
    client: &reqwest::Client,
    credentials: &RedditCredentials,
) -> Result<String, SourceError> {
    let body = retry::send_json(|| {
        client
            .post("https://www.reddit.com/api/v1/access_token")
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .header(reqwest::header::USER_AGENT, &credentials.user_agent)
            .form(&[("grant_type", "client_credentials")])
    })
    .await?;

    body.get("access_token")
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| SourceError::Api {
            message: "token response had no access_token".to_owned(),
        })
}

/// Converts one search-result child into a [`SocialPost`], or `None`
/// when the post is malformed or not recognizably about Baltimore.
fn normalize_post(child: &serde_json::Value, category: &str) -> Option<SocialPost> {
    let data = child.get("data")?;
    let post_id = data.get("id")?.as_str()?.to_owned();
    let title = data.get("title")?.as_str()?.to_owned();
    let selftext = data
        .get("selftext")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();

    let full_text = format!("{title} {selftext}");
    if !is_baltimore_relevant(&full_text) {
        return None;
    }

    #[allow(clippy::cast_possible_truncation)]
    let created = DateTime::from_timestamp(
        data.get("created_utc")?.as_f64()? as i64,
        0,
    )?;

    let permalink = data
        .get("permalink")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();

    let lowered = full_text.to_lowercase();

    Some(SocialPost {
        post_id,
        category: category.to_owned(),
        title,
        text: selftext.chars().take(MAX_TEXT_LEN).collect(),
        url: format!("https://reddit.com{permalink}"),
        score: data
            .get("score")
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(0),
        num_comments: data
            .get("num_comments")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0),
        created,
        location_hints: extract_location_hints(&full_text),
        damage_intensity: score_damage_intensity(&lowered),
        chronic_signal: CHRONIC_WORDS.iter().any(|w| lowered.contains(w)),
    })
}

/// Quick check that a post is actually about Baltimore: either a
/// city-wide signal or a known neighborhood/street mention.
#[must_use]
pub fn is_baltimore_relevant(text: &str) -> bool {
    let lowered = text.to_lowercase();
    CITY_SIGNALS
        .iter()
        .chain(LOCATION_SIGNALS)
        .any(|signal| lowered.contains(signal))
}

/// Extracts street and neighborhood mentions from post text.
///
/// Combines regex street-pattern matches with the known-signal list;
/// results are lowercased and deduplicated.
#[must_use]
pub fn extract_location_hints(text: &str) -> Vec<String> {
    let mut hints: BTreeSet<String> = BTreeSet::new();

    for pattern in STREET_PATTERNS.iter() {
        for captures in pattern.captures_iter(text) {
            if let Some(m) = captures.get(1) {
                hints.insert(m.as_str().to_lowercase());
            }
        }
    }

    let lowered = text.to_lowercase();
    for signal in LOCATION_SIGNALS {
        if lowered.contains(signal) {
            hints.insert((*signal).to_owned());
        }
    }

    hints.into_iter().collect()
}

/// Heuristic 1-5 score for how severe the described problem seems.
///
/// Intentionally naive: damage and severity words add half a point
/// each, chronic signals a full point, capped at 5.
#[must_use]
pub fn score_damage_intensity(lowered_text: &str) -> u8 {
    let mut score = 1.0_f64;

    for word in DAMAGE_WORDS {
        if lowered_text.contains(word) {
            score += 0.5;
        }
    }
    for word in SEVERE_WORDS {
        if lowered_text.contains(word) {
            score += 0.5;
        }
    }
    for word in CHRONIC_WORDS {
        if lowered_text.contains(word) {
            score += 1.0;
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        (score.round() as u8).min(5)
    }
}
