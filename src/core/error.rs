//! Error handling for the updater
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`UpdateError`]) so the update controller and
//!    the browser provisioner can branch on the failure mode
//! 2. **User-friendly messages** ([`ErrorContext`]) with actionable suggestions
//!    for the presentation layer and the CLI host
//!
//! # Taxonomy
//!
//! | Variant | Retried locally | Surfaces as |
//! |---------|-----------------|-------------|
//! | [`UpdateError::Network`] | when `transient` | `Failed(Network)` |
//! | [`UpdateError::RateLimited`] | no | `Failed(RateLimited)` |
//! | [`UpdateError::NotFound`] | no | `Failed(NotFound)` |
//! | [`UpdateError::MalformedPayload`] | no | `Failed(MalformedPayload)` |
//! | [`UpdateError::MalformedVersion`] | no | `Failed(MalformedVersion)` |
//! | [`UpdateError::AssetNotFoundForPlatform`] | no | `Failed(AssetNotFoundForPlatform)` |
//! | [`UpdateError::DownloadIntegrity`] | no | `Failed(DownloadIntegrity)` |
//! | [`UpdateError::InstallerLaunch`] | no | `Failed(InstallerLaunch)` |
//! | [`UpdateError::BrowserUnavailable`] | every strategy falls through first | automation disabled |
//!
//! No variant is fatal to the host application. An update failure leaves the
//! application on its current version and a provisioning failure only disables
//! the automation feature.
//!
//! # Examples
//!
//! ```rust,no_run
//! use autologin_updater::core::{ErrorKind, UpdateError};
//!
//! let error = UpdateError::MalformedVersion { input: "abc".to_string() };
//! assert_eq!(error.kind(), ErrorKind::MalformedVersion);
//! assert!(!error.is_transient());
//!
//! // Snapshot suitable for the UI layer
//! let failure = error.failure();
//! assert_eq!(failure.kind, ErrorKind::MalformedVersion);
//! ```

use crate::browser::ProvisionAttempt;
use colored::Colorize;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Convenient result alias for updater operations.
pub type Result<T> = std::result::Result<T, UpdateError>;

/// The main error type for update and provisioning operations.
///
/// Each variant maps one-to-one onto an [`ErrorKind`]. The variants carry
/// owned, human-readable details instead of foreign error types so that a
/// failure can be snapshotted into [`UpdateFailure`] and handed to readers of
/// the update state without sharing the original error.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// A network operation failed.
    ///
    /// `transient` marks timeouts, connection resets and 5xx responses which
    /// the release client and the downloader retry locally.
    #[error("network error during {operation}: {reason}")]
    Network {
        /// What was being attempted (e.g. "release lookup").
        operation: String,
        /// Underlying cause.
        reason: String,
        /// Whether retrying may succeed.
        transient: bool,
    },

    /// The release registry refused the request because of rate limiting.
    #[error("release registry rate limit exceeded{}", reset_hint(.reset_at))]
    RateLimited {
        /// When the registry says the limit resets, if it said so.
        reset_at: Option<chrono::DateTime<chrono::Utc>>,
    },

    /// The repository or its latest release does not exist.
    #[error("no published release found for '{repository}'")]
    NotFound {
        /// The `owner/repo` pair that was queried.
        repository: String,
    },

    /// The registry answered with a body that is not a release description.
    #[error("malformed release payload: {reason}")]
    MalformedPayload {
        /// Decoder message.
        reason: String,
    },

    /// A version string could not be parsed.
    #[error("malformed version string '{input}'")]
    MalformedVersion {
        /// The offending input.
        input: String,
    },

    /// The release is newer but carries no installer for this platform.
    #[error("no release asset matches platform {platform} (expected a '{marker}' installer)")]
    AssetNotFoundForPlatform {
        /// Platform display name.
        platform: String,
        /// Filename marker that was searched for.
        marker: String,
        /// Human-facing releases page where the user can download manually.
        releases_page: Option<String>,
    },

    /// The downloaded file does not match what the release declared.
    #[error("download integrity check failed for '{asset}': expected {expected}, got {actual}")]
    DownloadIntegrity {
        /// Asset file name.
        asset: String,
        /// Declared size or checksum.
        expected: String,
        /// Observed size or checksum.
        actual: String,
    },

    /// The platform installer could not be started.
    #[error("failed to launch installer '{}': {reason}", path.display())]
    InstallerLaunch {
        /// Installer file that was being launched.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// Every browser provisioning strategy failed.
    #[error("automation browser unavailable after {} provisioning attempt(s)", attempts.len())]
    BrowserUnavailable {
        /// Ordered history of the strategies that were tried.
        attempts: Vec<ProvisionAttempt>,
    },

    /// The operation observed its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// Local filesystem failure.
    #[error("I/O error during {operation}: {source}")]
    Io {
        /// What was being attempted.
        operation: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

fn reset_hint(reset_at: &Option<chrono::DateTime<chrono::Utc>>) -> String {
    match reset_at {
        Some(at) => format!(" (resets at {})", at.format("%H:%M:%S UTC")),
        None => String::new(),
    }
}

/// Discriminant of [`UpdateError`], cheap to copy into UI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`UpdateError::Network`].
    Network,
    /// See [`UpdateError::RateLimited`].
    RateLimited,
    /// See [`UpdateError::NotFound`].
    NotFound,
    /// See [`UpdateError::MalformedPayload`].
    MalformedPayload,
    /// See [`UpdateError::MalformedVersion`].
    MalformedVersion,
    /// See [`UpdateError::AssetNotFoundForPlatform`].
    AssetNotFoundForPlatform,
    /// See [`UpdateError::DownloadIntegrity`].
    DownloadIntegrity,
    /// See [`UpdateError::InstallerLaunch`].
    InstallerLaunch,
    /// See [`UpdateError::BrowserUnavailable`].
    BrowserUnavailable,
    /// See [`UpdateError::Cancelled`].
    Cancelled,
    /// See [`UpdateError::Io`].
    Io,
    /// See [`UpdateError::Config`].
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "NetworkError",
            Self::RateLimited => "RateLimited",
            Self::NotFound => "NotFound",
            Self::MalformedPayload => "MalformedPayload",
            Self::MalformedVersion => "MalformedVersion",
            Self::AssetNotFoundForPlatform => "AssetNotFoundForPlatform",
            Self::DownloadIntegrity => "DownloadIntegrityError",
            Self::InstallerLaunch => "InstallerLaunchError",
            Self::BrowserUnavailable => "BrowserUnavailable",
            Self::Cancelled => "Cancelled",
            Self::Io => "IoError",
            Self::Config => "ConfigError",
        };
        f.write_str(name)
    }
}

impl ErrorKind {
    /// Actionable advice for the user, when there is any.
    pub const fn suggestion(self) -> Option<&'static str> {
        match self {
            Self::Network => Some("Check your internet connection and try again"),
            Self::RateLimited => {
                Some("Wait a while before checking again, or configure upgrade.github_token")
            }
            Self::NotFound => Some("Verify upgrade.repository points at the release repository"),
            Self::AssetNotFoundForPlatform => {
                Some("Download the installer for your platform from the releases page")
            }
            Self::DownloadIntegrity => Some("Retry the download; the file was incomplete or corrupted"),
            Self::InstallerLaunch => {
                Some("Run the downloaded installer manually after closing the application")
            }
            Self::BrowserUnavailable => Some(
                "Check your internet connection, set AUTOLOGIN_BROWSER_PATH to an installed Chromium, \
                 or run `playwright install chromium`",
            ),
            _ => None,
        }
    }
}

/// Cloneable snapshot of an error, stored in `UpdateState::Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateFailure {
    /// Typed failure mode.
    pub kind: ErrorKind,
    /// Human-readable explanation.
    pub detail: String,
}

impl fmt::Display for UpdateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl UpdateError {
    /// Build a non-transient network error.
    pub fn network(operation: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Network {
            operation: operation.into(),
            reason: reason.to_string(),
            transient: false,
        }
    }

    /// Build a transient (retryable) network error.
    pub fn transient(operation: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Network {
            operation: operation.into(),
            reason: reason.to_string(),
            transient: true,
        }
    }

    /// Wrap an I/O error with the operation that produced it.
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// The typed discriminant of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::MalformedPayload { .. } => ErrorKind::MalformedPayload,
            Self::MalformedVersion { .. } => ErrorKind::MalformedVersion,
            Self::AssetNotFoundForPlatform { .. } => ErrorKind::AssetNotFoundForPlatform,
            Self::DownloadIntegrity { .. } => ErrorKind::DownloadIntegrity,
            Self::InstallerLaunch { .. } => ErrorKind::InstallerLaunch,
            Self::BrowserUnavailable { .. } => ErrorKind::BrowserUnavailable,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io { .. } => ErrorKind::Io,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether a local retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { transient: true, .. })
    }

    /// Snapshot this error for the update state.
    pub fn failure(&self) -> UpdateFailure {
        let detail = match self {
            Self::AssetNotFoundForPlatform {
                releases_page: Some(page),
                ..
            } => format!("{self}; download it manually from {page}"),
            _ => self.to_string(),
        };
        UpdateFailure {
            kind: self.kind(),
            detail,
        }
    }

    /// Actionable advice for the user, when there is any.
    pub fn suggestion(&self) -> Option<&'static str> {
        self.kind().suggestion()
    }
}

/// Error context wrapper that carries user-friendly details and suggestions.
///
/// This is what the CLI host prints and what the excluded GUI layer would
/// render: the typed error, an optional explanation, and an optional hint.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error.
    pub error: UpdateError,
    /// Actionable suggestion for resolving the error.
    pub suggestion: Option<String>,
    /// Additional details explaining the error.
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: UpdateError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// Typed [`UpdateError`]s keep their variant and get the matching suggestion.
/// Anything else is reported as a configuration or I/O problem with the full
/// `anyhow` context chain in the details.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let chain = format!("{error:#}");

    let error = match error.downcast::<UpdateError>() {
        Ok(typed) => {
            let ctx = ErrorContext::new(typed);
            return match ctx.error.suggestion() {
                Some(hint) => ctx.with_suggestion(hint),
                None => ctx,
            };
        }
        Err(other) => other,
    };

    match error.downcast::<std::io::Error>() {
        Ok(io_error) => {
            let suggestion = match io_error.kind() {
                std::io::ErrorKind::PermissionDenied => {
                    "Check that the download and data directories are writable"
                }
                std::io::ErrorKind::NotFound => "Check that the file or directory exists",
                _ => "Retry the operation",
            };
            ErrorContext::new(UpdateError::io("file access", io_error))
                .with_suggestion(suggestion)
                .with_details(chain)
        }
        Err(_) => ErrorContext::new(UpdateError::Config(chain)),
    }
}
