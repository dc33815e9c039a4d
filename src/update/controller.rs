//! Orchestration of the check → download → launch cycle.
//!
//! [`UpdateController`] is the only writer of the [`UpdateState`]. Readers
//! get snapshots through [`UpdateController::snapshot`] or follow changes
//! through a `watch` channel from [`UpdateController::subscribe`]; neither
//! can mutate the state.
//!
//! No operation returns an error: failures land in [`UpdateState::Failed`]
//! and the application keeps running its current version.

use super::state::{Transition, UpdateEvent, UpdateInfo, UpdateState};
use crate::config::UpgradeConfig;
use crate::core::{Result, UpdateError};
use crate::download::Downloader;
use crate::installer::{InstallerLauncher, PlatformInstaller};
use crate::release::{Platform, ReleaseClient, RemoteRelease, RepositoryId, select};
use crate::version::{VersionComparator, VersionOrdering, VersionResolver};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Drives the update lifecycle. Cheap to clone; clones share one state.
#[derive(Clone)]
pub struct UpdateController {
    inner: Arc<Inner>,
}

struct Inner {
    state: watch::Sender<UpdateState>,
    client: ReleaseClient,
    repository: RepositoryId,
    resolver: Arc<VersionResolver>,
    platform: Platform,
    downloader: Downloader,
    launcher: Box<dyn InstallerLauncher>,
    verify_checksum: bool,
    // Release of the active check, used for the checksum sidecar lookup.
    release: Mutex<Option<RemoteRelease>>,
    cancel: Mutex<CancellationToken>,
}

/// Builder for [`UpdateController`].
pub struct UpdateControllerBuilder {
    client: ReleaseClient,
    repository: RepositoryId,
    resolver: Option<Arc<VersionResolver>>,
    platform: Option<Platform>,
    downloader: Option<Downloader>,
    launcher: Option<Box<dyn InstallerLauncher>>,
    verify_checksum: bool,
}

impl UpdateControllerBuilder {
    /// Version resolver (default: the process-wide resolver for this executable).
    #[must_use]
    pub fn resolver(mut self, resolver: VersionResolver) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Target platform (default: the platform this binary was built for).
    #[must_use]
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Downloader (default: the system temp download directory).
    #[must_use]
    pub fn downloader(mut self, downloader: Downloader) -> Self {
        self.downloader = Some(downloader);
        self
    }

    /// Installer launcher (default: [`PlatformInstaller`]).
    #[must_use]
    pub fn launcher(mut self, launcher: impl InstallerLauncher + 'static) -> Self {
        self.launcher = Some(Box::new(launcher));
        self
    }

    /// Whether to verify `.sha256` sidecars (default: true).
    #[must_use]
    pub fn verify_checksum(mut self, verify: bool) -> Self {
        self.verify_checksum = verify;
        self
    }

    /// Build the controller in the `Idle` state.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no platform was given and this
    /// binary's platform has no installers.
    pub fn build(self) -> Result<UpdateController> {
        let platform = self
            .platform
            .or_else(Platform::current)
            .ok_or_else(|| UpdateError::Config("this platform has no installer format".into()))?;

        let resolver = self.resolver.unwrap_or_else(VersionResolver::shared);
        let downloader = self.downloader.unwrap_or_else(|| {
            Downloader::new(self.client.http().clone(), crate::utils::platform::default_download_dir())
        });
        let launcher = self.launcher.unwrap_or_else(|| Box::new(PlatformInstaller::new(platform)));
        let (state, _) = watch::channel(UpdateState::Idle);

        Ok(UpdateController {
            inner: Arc::new(Inner {
                state,
                client: self.client,
                repository: self.repository,
                resolver,
                platform,
                downloader,
                launcher,
                verify_checksum: self.verify_checksum,
                release: Mutex::new(None),
                cancel: Mutex::new(CancellationToken::new()),
            }),
        })
    }
}

impl UpdateController {
    /// Start building a controller for `repository`.
    pub fn builder(client: ReleaseClient, repository: RepositoryId) -> UpdateControllerBuilder {
        UpdateControllerBuilder {
            client,
            repository,
            resolver: None,
            platform: None,
            downloader: None,
            launcher: None,
            verify_checksum: true,
        }
    }

    /// Controller wired from the `[upgrade]` section for this executable.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid repository, an HTTP
    /// client that cannot be built, or an unsupported platform.
    pub fn from_config(config: &UpgradeConfig) -> Result<Self> {
        let client = ReleaseClient::from_config(config)?;
        let downloader = Downloader::from_config(client.http().clone(), config);
        Self::builder(client, config.repository_id()?)
            .downloader(downloader)
            .verify_checksum(config.verify_checksum)
            .build()
    }

    /// Current state.
    pub fn snapshot(&self) -> UpdateState {
        self.inner.state.borrow().clone()
    }

    /// Follow state changes.
    pub fn subscribe(&self) -> watch::Receiver<UpdateState> {
        self.inner.state.subscribe()
    }

    /// Repository this controller checks.
    pub fn repository(&self) -> &RepositoryId {
        &self.inner.repository
    }

    /// Cancel the active check or download. Launching is not cancellable.
    pub fn cancel(&self) {
        self.inner.current_token().cancel();
    }

    /// Check for a newer release.
    ///
    /// Ignored (no network traffic, no state change) while another operation
    /// is active. Returns the state afterwards.
    pub async fn check(&self) -> UpdateState {
        let Some(cancel) = self.inner.begin(UpdateEvent::CheckRequested) else {
            debug!("Update check already in progress, ignoring trigger");
            return self.snapshot();
        };

        let event = match self.inner.run_check(&cancel).await {
            Ok(event) => event,
            Err(UpdateError::Cancelled) => UpdateEvent::Cancelled,
            Err(e) => {
                warn!("Update check failed: {}", e);
                UpdateEvent::Failed(e.failure())
            }
        };
        self.inner.apply(event);
        self.snapshot()
    }

    /// Download the available update. Ignored unless an update is available.
    pub async fn download(&self) -> UpdateState {
        let Some(cancel) = self.inner.begin(UpdateEvent::DownloadRequested) else {
            debug!("No update available to download in state {}", self.snapshot().name());
            return self.snapshot();
        };

        let event = match self.inner.run_download(&cancel).await {
            Ok(path) => UpdateEvent::DownloadFinished(path),
            Err(UpdateError::Cancelled) => UpdateEvent::Cancelled,
            Err(e) => {
                warn!("Update download failed: {}", e);
                UpdateEvent::Failed(e.failure())
            }
        };
        self.inner.apply(event);
        self.snapshot()
    }

    /// Hand the downloaded installer to the platform. Ignored unless downloaded.
    ///
    /// On success the state stays `Launching` and the host should exit.
    pub fn launch(&self) -> UpdateState {
        if self.inner.apply(UpdateEvent::LaunchRequested) == Transition::Ignored {
            debug!("Nothing downloaded to launch in state {}", self.snapshot().name());
            return self.snapshot();
        }

        let UpdateState::Launching { path } = self.snapshot() else {
            return self.snapshot();
        };
        match self.inner.launcher.launch(&path) {
            Ok(()) => info!("Installer started; exit now to release file locks"),
            Err(e) => {
                warn!("Installer launch failed: {}", e);
                self.inner.apply(UpdateEvent::Failed(e.failure()));
            }
        }
        self.snapshot()
    }

    /// Run one check on the background runtime.
    pub fn spawn_check(&self) -> JoinHandle<UpdateState> {
        let controller = self.clone();
        tokio::spawn(async move { controller.check().await })
    }

    /// Re-check every `interval` until `shutdown` fires.
    ///
    /// The first tick is skipped; the startup check covers it. A tick that
    /// arrives while an operation is active is ignored like any other trigger.
    pub fn spawn_periodic(&self, interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        debug!("Periodic update check");
                        controller.check().await;
                    }
                }
            }
        })
    }
}

impl Inner {
    fn apply(&self, event: UpdateEvent) -> Transition {
        let mut outcome = Transition::Ignored;
        self.state.send_if_modified(|state| {
            outcome = state.apply(event);
            outcome == Transition::Moved
        });
        outcome
    }

    fn current_token(&self) -> CancellationToken {
        self.cancel.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Start an operation: apply `event` and install a fresh cancellation token.
    ///
    /// Both happen under the token lock, so a `cancel()` issued by anyone who
    /// has observed the new state always reaches the new token.
    fn begin(&self, event: UpdateEvent) -> Option<CancellationToken> {
        let mut slot = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        if self.apply(event) == Transition::Ignored {
            return None;
        }
        let token = CancellationToken::new();
        *slot = token.clone();
        Some(token)
    }

    async fn run_check(&self, cancel: &CancellationToken) -> Result<UpdateEvent> {
        let local = self.resolver.current_version();
        debug!("Running version {} ({})", local.version, local.provenance);

        let release = self.client.fetch_latest(&self.repository, cancel).await?;
        let latest = release.version()?;

        if VersionComparator::compare(&local.version, &latest) != VersionOrdering::Newer {
            info!("Up to date: running {}, latest {}", local.version, latest);
            return Ok(UpdateEvent::UpToDate {
                current: local.version.clone(),
                latest,
            });
        }

        let asset = match select(&release.assets, self.platform) {
            Ok(asset) => asset.clone(),
            Err(UpdateError::AssetNotFoundForPlatform { platform, marker, .. }) => {
                return Err(UpdateError::AssetNotFoundForPlatform {
                    platform,
                    marker,
                    releases_page: Some(self.repository.releases_page_url()),
                });
            }
            Err(e) => return Err(e),
        };

        info!("Update available: {} -> {} ({})", local.version, latest, asset.name);
        let info = UpdateInfo {
            current: local.version.clone(),
            latest,
            tag: release.tag.clone(),
            notes: release.notes.clone(),
            published_at: release.published_at,
            asset,
        };
        *self.release.lock().unwrap_or_else(PoisonError::into_inner) = Some(release);
        Ok(UpdateEvent::UpdateFound(info))
    }

    async fn run_download(&self, cancel: &CancellationToken) -> Result<PathBuf> {
        let info = self.state.borrow().update_info().cloned();
        let Some(info) = info else {
            return Err(UpdateError::Config("no update selected for download".into()));
        };

        let release = self.release.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let expected = match (&release, self.verify_checksum) {
            (Some(release), true) => self.downloader.fetch_checksum(release, &info.asset, cancel).await?,
            _ => None,
        };

        let progress = |transferred: u64, total: u64| {
            self.apply(UpdateEvent::Progress { transferred, total });
        };
        self.downloader
            .download(&info.asset, expected.as_deref(), &progress, cancel)
            .await
    }
}
