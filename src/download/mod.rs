//! Installer download with progress, bounded restarts and integrity checks.
//!
//! The body is streamed into a temporary file inside the download directory.
//! Only a transfer whose byte count matches the asset's declared size (and
//! whose SHA-256 matches the release sidecar, when one exists) is persisted
//! under the asset's name. Anything else is discarded with the temp file.
//!
//! A dropped connection restarts the whole transfer from byte zero. Progress
//! reported to the [`ProgressSink`] is a high-water mark, so a restart never
//! makes the reported count go backwards.
//!
//! ```rust,no_run
//! use autologin_updater::download::Downloader;
//! use autologin_updater::release::Asset;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(asset: Asset) -> autologin_updater::core::Result<()> {
//! let downloader = Downloader::new(reqwest::Client::new(), std::env::temp_dir().join("autologin_updates"));
//! let progress = |done: u64, total: u64| println!("{done}/{total}");
//! let path = downloader.download(&asset, None, &progress, &CancellationToken::new()).await?;
//! println!("saved to {}", path.display());
//! # Ok(())
//! # }
//! ```

pub mod checksum;

pub use checksum::ChecksumVerifier;

use crate::config::UpgradeConfig;
use crate::constants::{DOWNLOAD_MAX_ATTEMPTS, DOWNLOAD_TIMEOUT};
use crate::core::{Result, UpdateError};
use crate::release::{Asset, RemoteRelease};
use crate::utils::backoff::{exponential_backoff_with_delay, retry_schedule};
use crate::utils::progress::ProgressBar;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio_retry::RetryIf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const OPERATION: &str = "installer download";
const CHECKSUM_OPERATION: &str = "checksum download";

/// Receives download progress. Implementations must not block.
pub trait ProgressSink: Send + Sync {
    /// `transferred` never decreases across calls for one download.
    fn on_progress(&self, transferred: u64, total: u64);
}

impl<F> ProgressSink for F
where
    F: Fn(u64, u64) + Send + Sync,
{
    fn on_progress(&self, transferred: u64, total: u64) {
        self(transferred, total);
    }
}

impl ProgressSink for ProgressBar {
    fn on_progress(&self, transferred: u64, total: u64) {
        if total > 0 {
            self.set_length(total);
        }
        self.set_position(transferred);
    }
}

/// Sink that discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _transferred: u64, _total: u64) {}
}

/// Streams release assets to the download directory.
#[derive(Debug, Clone)]
pub struct Downloader {
    http: reqwest::Client,
    download_dir: PathBuf,
    max_attempts: usize,
    attempt_timeout: Duration,
}

struct Transfer {
    file: NamedTempFile,
    received: u64,
    sha256: String,
}

impl Downloader {
    /// Downloader writing into `download_dir`.
    pub fn new(http: reqwest::Client, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            download_dir: download_dir.into(),
            max_attempts: DOWNLOAD_MAX_ATTEMPTS,
            attempt_timeout: DOWNLOAD_TIMEOUT,
        }
    }

    /// Downloader configured from the `[upgrade]` section.
    pub fn from_config(http: reqwest::Client, config: &UpgradeConfig) -> Self {
        Self::new(http, config.download_dir()).with_attempt_timeout(config.download_timeout())
    }

    /// Override the number of attempts (minimum 1).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Override the timeout for one complete attempt.
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Directory receiving completed downloads.
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Download `asset` and return the path of the completed file.
    ///
    /// `expected_sha256` is checked after the size check when given.
    ///
    /// # Errors
    ///
    /// - `Network` once the attempt bound is exhausted, or for a non-retryable response
    /// - `DownloadIntegrity` on size or checksum mismatch; no file is left behind
    /// - `Cancelled` if `cancel` fires between chunks or before an attempt
    /// - `Io` when the download directory is not writable
    pub async fn download(
        &self,
        asset: &Asset,
        expected_sha256: Option<&str>,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| UpdateError::io(format!("creating {}", self.download_dir.display()), e))?;

        let destination = self.destination_for(asset)?;
        info!("Downloading {} to {}", asset.name, destination.display());

        let mut high_water = 0u64;
        let mut attempt = 1usize;
        let transfer = loop {
            if cancel.is_cancelled() {
                return Err(UpdateError::Cancelled);
            }

            match self.attempt(asset, &mut high_water, progress, cancel).await {
                Ok(transfer) => break transfer,
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        "Download of {} failed on attempt {}/{}: {}; restarting",
                        asset.name, attempt, self.max_attempts, e
                    );
                    let delay_index = u32::try_from(attempt - 1).unwrap_or(u32::MAX);
                    tokio::select! {
                        () = cancel.cancelled() => return Err(UpdateError::Cancelled),
                        _ = exponential_backoff_with_delay(delay_index) => {}
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        if asset.size > 0 && transfer.received != asset.size {
            return Err(UpdateError::DownloadIntegrity {
                asset: asset.name.clone(),
                expected: format!("{} bytes", asset.size),
                actual: format!("{} bytes", transfer.received),
            });
        }
        if asset.size == 0 {
            debug!("Registry declared no size for {}, skipping size check", asset.name);
        }

        if let Some(expected) = expected_sha256 {
            ChecksumVerifier::verify(&asset.name, expected, &transfer.sha256)?;
        }

        transfer
            .file
            .persist(&destination)
            .map_err(|e| UpdateError::io(format!("saving {}", destination.display()), e.error))?;

        info!("Downloaded {} ({} bytes)", asset.name, transfer.received);
        Ok(destination)
    }

    /// Fetch the expected SHA-256 for `asset` from its release sidecar.
    ///
    /// Returns `Ok(None)` when `release` has no sidecar for the asset. Failed
    /// attempts are retried on the same schedule and bound as the installer
    /// transfer.
    ///
    /// # Errors
    ///
    /// - `Network` once the attempt bound is exhausted, or for a non-retryable response
    /// - `MalformedPayload` when the sidecar holds no digest for the asset
    /// - `Cancelled` if `cancel` fires
    pub async fn fetch_checksum(
        &self,
        release: &RemoteRelease,
        asset: &Asset,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let name = checksum::sidecar_name(&asset.name);
        let Some(sidecar) = release.asset_named(&name) else {
            debug!("No {} in release {}, skipping checksum", name, release.tag);
            return Ok(None);
        };

        debug!("Fetching checksum from {}", sidecar.download_url);
        let content = RetryIf::spawn(
            retry_schedule(self.max_attempts - 1),
            || self.fetch_checksum_once(&sidecar.download_url, cancel),
            |e: &UpdateError| {
                let retry = e.is_transient() && !cancel.is_cancelled();
                if retry {
                    warn!("Checksum download for {} failed, retrying: {}", asset.name, e);
                }
                retry
            },
        )
        .await?;

        ChecksumVerifier::parse_checksum_file(&content, &asset.name)
            .map(Some)
            .ok_or_else(|| UpdateError::MalformedPayload {
                reason: format!("{name} holds no SHA-256 digest for {}", asset.name),
            })
    }

    async fn fetch_checksum_once(&self, url: &str, cancel: &CancellationToken) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(UpdateError::Cancelled);
        }

        let request = self.http.get(url).timeout(self.attempt_timeout);
        let response = tokio::select! {
            () = cancel.cancelled() => return Err(UpdateError::Cancelled),
            response = request.send() => response.map_err(|e| UpdateError::transient(CHECKSUM_OPERATION, e))?,
        };

        let status = response.status();
        if !status.is_success() {
            let reason = format!("server responded {status}");
            return Err(if status.is_server_error() {
                UpdateError::transient(CHECKSUM_OPERATION, reason)
            } else {
                UpdateError::network(CHECKSUM_OPERATION, reason)
            });
        }

        tokio::select! {
            () = cancel.cancelled() => Err(UpdateError::Cancelled),
            text = response.text() => text.map_err(|e| UpdateError::transient(CHECKSUM_OPERATION, e)),
        }
    }

    fn destination_for(&self, asset: &Asset) -> Result<PathBuf> {
        // Only the final component; the registry controls the name.
        Path::new(&asset.name)
            .file_name()
            .map(|name| self.download_dir.join(name))
            .ok_or_else(|| UpdateError::MalformedPayload {
                reason: format!("asset name '{}' is not a file name", asset.name),
            })
    }

    async fn attempt(
        &self,
        asset: &Asset,
        high_water: &mut u64,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Transfer> {
        let temp = NamedTempFile::new_in(&self.download_dir)
            .map_err(|e| UpdateError::io("creating temporary download file", e))?;
        let handle = temp
            .as_file()
            .try_clone()
            .map_err(|e| UpdateError::io("opening temporary download file", e))?;
        let mut file = tokio::fs::File::from_std(handle);

        let request = self.http.get(&asset.download_url).timeout(self.attempt_timeout);
        let response = tokio::select! {
            () = cancel.cancelled() => return Err(UpdateError::Cancelled),
            response = request.send() => response.map_err(|e| UpdateError::transient(OPERATION, e))?,
        };

        let status = response.status();
        if !status.is_success() {
            let reason = format!("server responded {status}");
            return Err(if status.is_server_error() {
                UpdateError::transient(OPERATION, reason)
            } else {
                UpdateError::network(OPERATION, reason)
            });
        }

        let total = response.content_length().filter(|len| *len > 0).unwrap_or(asset.size);
        let mut stream = response.bytes_stream();
        let mut digest = ChecksumVerifier::new();
        let mut received = 0u64;

        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => return Err(UpdateError::Cancelled),
                next = stream.next() => next,
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(|e| UpdateError::transient(OPERATION, e))?;

            file.write_all(&chunk)
                .await
                .map_err(|e| UpdateError::io("writing installer", e))?;
            digest.update(&chunk);
            received += chunk.len() as u64;

            if received > *high_water {
                *high_water = received;
                progress.on_progress(received, total);
            }
        }

        file.flush().await.map_err(|e| UpdateError::io("flushing installer", e))?;
        file.sync_all().await.map_err(|e| UpdateError::io("syncing installer", e))?;

        Ok(Transfer {
            file: temp,
            received,
            sha256: digest.finalize_hex(),
        })
    }
}
