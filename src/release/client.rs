//! Release registry client.
//!
//! Issues `GET {api}/repos/{owner}/{repo}/releases/latest` with a bounded
//! timeout and maps the response onto the typed error taxonomy. Transient
//! failures (timeouts, connection errors, 5xx) are retried with exponential
//! backoff; everything else fails on the first attempt.

use super::model::{GithubRelease, RemoteRelease};
use crate::config::UpgradeConfig;
use crate::constants::{DEFAULT_API_BASE_URL, RELEASE_MAX_RETRIES, RELEASE_REQUEST_TIMEOUT};
use crate::core::{Result, UpdateError};
use crate::utils::backoff::retry_schedule;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const OPERATION: &str = "release lookup";

/// An `owner/repository` pair on the release registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryId {
    owner: String,
    name: String,
}

impl RepositoryId {
    /// Create a repository identifier.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-facing page of the latest release, for manual downloads.
    pub fn releases_page_url(&self) -> String {
        format!("https://github.com/{}/{}/releases/latest", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryId {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(owner, name))
            }
            _ => Err(UpdateError::Config(format!(
                "invalid repository '{s}', expected 'owner/name'"
            ))),
        }
    }
}

/// HTTP client for the release registry.
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    http: reqwest::Client,
    api_base_url: String,
    token: Option<String>,
    max_retries: usize,
}

impl ReleaseClient {
    /// Client against `api_base_url` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be constructed.
    pub fn new(api_base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("autologin-updater/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpdateError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            token: None,
            max_retries: RELEASE_MAX_RETRIES,
        })
    }

    /// Client with the default GitHub endpoint and timeout.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be constructed.
    pub fn github() -> Result<Self> {
        Self::new(DEFAULT_API_BASE_URL, RELEASE_REQUEST_TIMEOUT)
    }

    /// Client configured from the `[upgrade]` section.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be constructed.
    pub fn from_config(config: &UpgradeConfig) -> Result<Self> {
        let client = Self::new(&config.api_base_url, Duration::from_secs(config.request_timeout_secs))?;
        Ok(match &config.github_token {
            Some(token) => client.with_token(token),
            None => client,
        })
    }

    /// Authenticate requests with a bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Override the number of retries after the first attempt.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// The underlying HTTP client, shared with the downloader.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Fetch the latest published release of `repository`.
    ///
    /// Cancellation is honored before each attempt and while a request is
    /// in flight.
    ///
    /// # Errors
    ///
    /// - `Network` after the retry bound is exhausted, or for non-retryable 4xx
    /// - `RateLimited` for 429, or 403 with an exhausted rate limit
    /// - `NotFound` for 404
    /// - `MalformedPayload` when the body is not a release description
    /// - `Cancelled` if `cancel` fires
    pub async fn fetch_latest(
        &self,
        repository: &RepositoryId,
        cancel: &CancellationToken,
    ) -> Result<RemoteRelease> {
        let url = format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base_url, repository.owner, repository.name
        );
        debug!("Fetching latest release from {}", url);

        let release = RetryIf::spawn(
            retry_schedule(self.max_retries),
            || self.fetch_once(&url, repository, cancel),
            |e: &UpdateError| {
                let retry = e.is_transient() && !cancel.is_cancelled();
                if retry {
                    warn!("Release lookup failed, retrying: {}", e);
                }
                retry
            },
        )
        .await?;

        info!("Latest release of {} is {}", repository, release.tag);
        Ok(release)
    }

    async fn fetch_once(
        &self,
        url: &str,
        repository: &RepositoryId,
        cancel: &CancellationToken,
    ) -> Result<RemoteRelease> {
        if cancel.is_cancelled() {
            return Err(UpdateError::Cancelled);
        }

        let mut request = self.http.get(url).header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = tokio::select! {
            () = cancel.cancelled() => return Err(UpdateError::Cancelled),
            response = request.send() => response.map_err(classify_transport)?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, response.headers(), repository));
        }

        let body = tokio::select! {
            () = cancel.cancelled() => return Err(UpdateError::Cancelled),
            body = response.bytes() => body.map_err(classify_transport)?,
        };

        let wire: GithubRelease = serde_json::from_slice(&body).map_err(|e| UpdateError::MalformedPayload {
            reason: e.to_string(),
        })?;
        Ok(wire.into())
    }
}

fn classify_transport(error: reqwest::Error) -> UpdateError {
    if error.is_builder() {
        UpdateError::network(OPERATION, error)
    } else {
        // timeouts, refused connections, resets and truncated bodies
        UpdateError::transient(OPERATION, error)
    }
}

fn classify_status(status: StatusCode, headers: &HeaderMap, repository: &RepositoryId) -> UpdateError {
    let remaining = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(str::trim);

    if status == StatusCode::NOT_FOUND {
        UpdateError::NotFound {
            repository: repository.to_string(),
        }
    } else if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && remaining == Some("0"))
    {
        UpdateError::RateLimited {
            reset_at: rate_limit_reset(headers),
        }
    } else if status.is_server_error() {
        UpdateError::transient(OPERATION, format!("server responded {status}"))
    } else {
        UpdateError::network(OPERATION, format!("server responded {status}"))
    }
}

fn rate_limit_reset(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    headers
        .get("x-ratelimit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}
