//! Test utilities shared by unit and integration tests.
//!
//! Enabled for `cfg(test)` and for the `test-utils` feature so the
//! integration tests under `tests/` can use them too.
//!
//! # Example
//!
//! ```rust,no_run
//! use autologin_updater::test_utils::{ReleaseFixture, init_test_logging};
//!
//! init_test_logging(None);
//! let payload = ReleaseFixture::new("v1.0.16")
//!     .asset("AutoLogin-1.0.16.msi", 2048, "http://127.0.0.1:8080/AutoLogin-1.0.16.msi")
//!     .to_json();
//! assert_eq!(payload["tag_name"], "v1.0.16");
//! ```

use crate::core::{Result, UpdateError};
use crate::installer::InstallerLauncher;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Runs once per process. Uses `level` when given, otherwise `RUST_LOG`;
/// with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=autologin_updater=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Builder for GitHub "latest release" payloads.
#[derive(Debug, Clone)]
pub struct ReleaseFixture {
    tag: String,
    body: String,
    published_at: String,
    assets: Vec<Value>,
}

impl ReleaseFixture {
    /// Release tagged `tag` with no assets.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            body: "Bug fixes".to_string(),
            published_at: "2026-03-01T12:00:00Z".to_string(),
            assets: Vec::new(),
        }
    }

    /// Replace the release notes.
    #[must_use]
    pub fn notes(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Append an asset.
    #[must_use]
    pub fn asset(mut self, name: &str, size: u64, url: &str) -> Self {
        self.assets.push(json!({
            "name": name,
            "size": size,
            "browser_download_url": url,
            "content_type": "application/octet-stream",
        }));
        self
    }

    /// Serialize in the registry's wire format.
    pub fn to_json(&self) -> Value {
        json!({
            "tag_name": self.tag,
            "name": format!("AutoLogin {}", self.tag),
            "body": self.body,
            "draft": false,
            "prerelease": false,
            "published_at": self.published_at,
            "assets": self.assets,
        })
    }
}

/// Installer launcher that records paths instead of spawning anything.
#[derive(Debug, Clone, Default)]
pub struct RecordingLauncher {
    launched: Arc<Mutex<Vec<PathBuf>>>,
    fail: bool,
}

impl RecordingLauncher {
    /// Launcher that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Launcher that always fails with `InstallerLaunch`.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Paths launched so far.
    pub fn launched(&self) -> Vec<PathBuf> {
        self.launched.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl InstallerLauncher for RecordingLauncher {
    fn launch(&self, installer: &Path) -> Result<()> {
        if let Ok(mut launched) = self.launched.lock() {
            launched.push(installer.to_path_buf());
        }
        if self.fail {
            return Err(UpdateError::InstallerLaunch {
                path: installer.to_path_buf(),
                reason: "simulated launch failure".to_string(),
            });
        }
        Ok(())
    }
}
