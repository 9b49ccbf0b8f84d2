//! HTTP retry helpers for transient errors.
//!
//! Fetchers call [`send_json`] instead of `reqwest::RequestBuilder::send()`
//! directly, so every request gets automatic retry with exponential
//! backoff on timeouts, connection resets, HTTP 429, and HTTP 5xx.

use std::time::Duration;

use crate::SourceError;

/// Maximum retry attempts for transient HTTP errors. With exponential
/// backoff (2s, 4s, 8s) the total wait before giving up is 14 seconds.
const MAX_RETRIES: u32 = 3;

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`. Retries connection errors, timeouts, HTTP 429, and HTTP
/// 5xx; other 4xx statuses are permanent and fail immediately.
///
/// # Errors
///
/// Returns [`SourceError`] if the request still fails after all
/// retries, or the response body is not valid JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        // `Some(reason)` means the attempt failed transiently.
        let reason = match build_request().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response.json().await?);
                }
                if retryable_status(status) {
                    format!("HTTP {status}")
                } else {
                    return Err(SourceError::Api {
                        message: format!("HTTP {status} from {}", response.url()),
                    });
                }
            }
            Err(err) if err.is_timeout() || err.is_connect() || err.is_request() => err.to_string(),
            Err(err) => return Err(err.into()),
        };

        attempt += 1;
        if attempt > MAX_RETRIES {
            return Err(SourceError::Api {
                message: format!("giving up after {MAX_RETRIES} retries: {reason}"),
            });
        }

        let backoff = Duration::from_secs(2_u64.pow(attempt));
        log::warn!("transient HTTP error ({reason}), retry {attempt}/{MAX_RETRIES} in {backoff:?}");
        tokio::time::sleep(backoff).await;
    }
}

fn retryable_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error() || status.as_u16() == 429
}
