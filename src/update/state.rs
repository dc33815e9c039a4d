//! The update lifecycle as an explicit state machine.
//!
//! ```text
//! Idle ─check─► Checking ─┬─► NoUpdate
//!                         └─► UpdateAvailable ─download─► Downloading ─► Downloaded ─launch─► Launching
//!
//! Checking | Downloading | Launching ─error─► Failed ─check─► Checking
//! Checking | Downloading ─cancel─► Idle
//! ```
//!
//! [`UpdateState::apply`] is total: every `(state, event)` pair either moves
//! the machine or is reported as [`Transition::Ignored`] without touching it.
//! A check requested while an operation is active is ignored, never queued.

use crate::core::UpdateFailure;
use crate::release::Asset;
use crate::version::SemVer;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// What the latest check found when a newer release exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateInfo {
    /// Version currently running.
    pub current: SemVer,
    /// Version of the latest release.
    pub latest: SemVer,
    /// Raw release tag.
    pub tag: String,
    /// Release notes.
    pub notes: String,
    /// When the release was published.
    pub published_at: Option<DateTime<Utc>>,
    /// Installer selected for this platform.
    pub asset: Asset,
}

/// Current position in the update lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UpdateState {
    /// Nothing has happened yet, or the last operation was cancelled.
    Idle,
    /// Resolving versions and querying the registry.
    Checking,
    /// The latest release is not newer than the running version.
    NoUpdate {
        /// Version currently running.
        current: SemVer,
        /// Version of the latest release.
        latest: SemVer,
    },
    /// A newer release with an installer for this platform exists.
    UpdateAvailable(UpdateInfo),
    /// The installer is being downloaded.
    Downloading {
        /// The update being downloaded.
        info: UpdateInfo,
        /// Bytes received so far (never decreases).
        transferred: u64,
        /// Expected total bytes.
        total: u64,
    },
    /// The installer is on disk.
    Downloaded {
        /// The downloaded update.
        info: UpdateInfo,
        /// Installer location.
        path: PathBuf,
    },
    /// The installer has been handed off; the host should exit.
    Launching {
        /// Installer location.
        path: PathBuf,
    },
    /// The last operation failed.
    Failed(UpdateFailure),
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    /// A check was triggered (startup, manual, or periodic).
    CheckRequested,
    /// The check found no newer release.
    UpToDate {
        /// Version currently running.
        current: SemVer,
        /// Version of the latest release.
        latest: SemVer,
    },
    /// The check found a newer release with a matching installer.
    UpdateFound(UpdateInfo),
    /// The user asked to download the available update.
    DownloadRequested,
    /// Download progress.
    Progress {
        /// Bytes received so far.
        transferred: u64,
        /// Expected total bytes.
        total: u64,
    },
    /// The download completed and passed integrity checks.
    DownloadFinished(PathBuf),
    /// The user asked to install the downloaded update.
    LaunchRequested,
    /// The active operation failed.
    Failed(UpdateFailure),
    /// The active operation observed its cancellation token.
    Cancelled,
}

/// Result of applying an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The state changed.
    Moved,
    /// The event does not apply to the current state; nothing changed.
    Ignored,
}

impl UpdateState {
    /// Whether an operation is in flight.
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Checking | Self::Downloading { .. } | Self::Launching { .. })
    }

    /// Short lowercase name of the state.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::NoUpdate { .. } => "no_update",
            Self::UpdateAvailable(_) => "update_available",
            Self::Downloading { .. } => "downloading",
            Self::Downloaded { .. } => "downloaded",
            Self::Launching { .. } => "launching",
            Self::Failed(_) => "failed",
        }
    }

    /// The update this state refers to, if any.
    pub const fn update_info(&self) -> Option<&UpdateInfo> {
        match self {
            Self::UpdateAvailable(info) | Self::Downloading { info, .. } | Self::Downloaded { info, .. } => {
                Some(info)
            }
            _ => None,
        }
    }

    /// Apply `event`, returning whether the state moved.
    pub fn apply(&mut self, event: UpdateEvent) -> Transition {
        let next = match (&*self, event) {
            (state, UpdateEvent::CheckRequested) if state.is_active() => None,
            (_, UpdateEvent::CheckRequested) => Some(Self::Checking),

            (Self::Checking, UpdateEvent::UpToDate { current, latest }) => {
                Some(Self::NoUpdate { current, latest })
            }
            (Self::Checking, UpdateEvent::UpdateFound(info)) => Some(Self::UpdateAvailable(info)),

            (Self::UpdateAvailable(info), UpdateEvent::DownloadRequested) => Some(Self::Downloading {
                total: info.asset.size,
                info: info.clone(),
                transferred: 0,
            }),
            (
                Self::Downloading {
                    info,
                    transferred: seen,
                    ..
                },
                UpdateEvent::Progress { transferred, total },
            ) if transferred > *seen => Some(Self::Downloading {
                info: info.clone(),
                transferred,
                total,
            }),
            (Self::Downloading { info, .. }, UpdateEvent::DownloadFinished(path)) => Some(Self::Downloaded {
                info: info.clone(),
                path,
            }),

            (Self::Downloaded { path, .. }, UpdateEvent::LaunchRequested) => {
                Some(Self::Launching { path: path.clone() })
            }

            (state, UpdateEvent::Failed(failure)) if state.is_active() => Some(Self::Failed(failure)),
            (Self::Checking | Self::Downloading { .. }, UpdateEvent::Cancelled) => Some(Self::Idle),

            _ => None,
        };

        match next {
            Some(state) => {
                *self = state;
                Transition::Moved
            }
            None => Transition::Ignored,
        }
    }
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Checking => write!(f, "checking for updates"),
            Self::NoUpdate { current, latest } => {
                write!(f, "up to date (running {current}, latest {latest})")
            }
            Self::UpdateAvailable(info) => {
                write!(f, "update available: {} -> {} ({})", info.current, info.latest, info.asset.name)
            }
            Self::Downloading {
                info,
                transferred,
                total,
            } => write!(f, "downloading {} ({transferred}/{total} bytes)", info.asset.name),
            Self::Downloaded { path, .. } => write!(f, "downloaded to {}", path.display()),
            Self::Launching { path } => write!(f, "launching installer {}", path.display()),
            Self::Failed(failure) => write!(f, "failed: {failure}"),
        }
    }
}
