use async_trait::async_trait;
use clap::crate_version;
use log::debug;
use reqwest::{header, StatusCode};
use std::time::Duration;

use crate::error::{Error, FetchError, Result};

/// User agent sent to tile servers. Some imagery servers reject requests
/// without a browser-like agent.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// A raw response from a tile server.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub body: Vec<u8>,
    /// Parsed `Retry-After` header (seconds form only).
    pub retry_after: Option<Duration>,
}

impl Response {
    pub fn new(status: StatusCode, body: Vec<u8>) -> Self {
        Self {
            status,
            body,
            retry_after: None,
        }
    }
}

/// Fetches raw tile bytes from a URL.
#[async_trait]
pub trait Transport {
    async fn get(&self, url: &str) -> Result<Response, FetchError>;
}

/// A [`Transport`] backed by a reqwest HTTP client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a client with the given per-request timeout. Pass the zero
    /// duration to disable the timeout.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if timeout > Duration::from_secs(0) {
            builder = builder.timeout(timeout);
        }

        let user_agent = if user_agent.is_empty() {
            format!("tile-archiver_rs_{}", crate_version!())
        } else {
            user_agent.to_owned()
        };

        let client = builder
            .user_agent(user_agent)
            .build()
            .map_err(Error::Client)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Response, FetchError> {
        let raw_response = self.client.get(url).send().await?;
        let status = raw_response.status();
        let retry_after = raw_response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok())
            .map(Duration::from_secs);

        let body = raw_response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        Ok(Response {
            status,
            body: body.to_vec(),
            retry_after,
        })
    }
}

/// How a single tile fetch is retried.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per tile, including the first one.
    pub max_attempts: u8,

    /// Pause between failed attempts.
    pub retry_delay: Duration,

    /// Statuses meaning the tile does not exist. These are never retried.
    pub absent_statuses: Vec<StatusCode>,

    /// Upper bound on a server's `Retry-After` hint.
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_millis(500),
            absent_statuses: vec![StatusCode::NOT_FOUND],
            max_retry_after: Duration::from_secs(10),
        }
    }
}

/// Fetches a single tile, retrying transient failures.
///
/// Returns `None` if the server reports the tile as absent, answers with an
/// empty body, or every attempt failed. Failures are never surfaced; the
/// worst outcome for a tile is that it is skipped.
pub async fn fetch_tile<T>(transport: &T, url: &str, policy: &RetryPolicy) -> Option<Vec<u8>>
where
    T: Transport + Sync + ?Sized,
{
    for attempt in 1..=policy.max_attempts {
        let mut delay = policy.retry_delay;

        match transport.get(url).await {
            Ok(res) if res.status.is_success() => {
                if res.body.is_empty() {
                    debug!("{} returned an empty tile", url);
                    return None;
                }
                return Some(res.body);
            }
            Ok(res) if policy.absent_statuses.contains(&res.status) => {
                debug!("{} not found ({})", url, res.status);
                return None;
            }
            Ok(res) => {
                if res.status == StatusCode::TOO_MANY_REQUESTS {
                    if let Some(retry_after) = res.retry_after {
                        delay = retry_after.min(policy.max_retry_after);
                    }
                }
                debug!(
                    "attempt {}/{} for {} failed: {}",
                    attempt,
                    policy.max_attempts,
                    url,
                    FetchError::Status(res.status)
                );
            }
            Err(e) => {
                debug!(
                    "attempt {}/{} for {} failed: {}",
                    attempt, policy.max_attempts, url, e
                );
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(delay).await;
        }
    }

    None
}
