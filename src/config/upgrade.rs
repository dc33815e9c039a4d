use crate::constants::{DEFAULT_API_BASE_URL, DEFAULT_REPOSITORY};
use crate::core::Result;
use crate::release::RepositoryId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Settings for the `[upgrade]` section.
///
/// # Default Behavior
///
/// - Check once at startup, never periodically
/// - Query `TradinxLite/autologin` on the public GitHub API
/// - Verify a `.sha256` sidecar when the release has one
///
/// ```rust
/// use autologin_updater::config::UpgradeConfig;
///
/// let config = UpgradeConfig::default();
/// assert!(config.check_on_startup);
/// assert_eq!(config.check_interval, 0);
/// assert!(config.periodic_interval().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeConfig {
    /// `owner/name` of the repository publishing releases.
    #[serde(default = "default_repository")]
    pub repository: String,

    /// Base URL of the release registry API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Whether the host triggers one check when it starts.
    #[serde(default = "default_check_on_startup")]
    pub check_on_startup: bool,

    /// Seconds between background re-checks. `0` disables them.
    #[serde(default)]
    pub check_interval: u64,

    /// Verify downloads against a `<asset>.sha256` release asset when present.
    #[serde(default = "default_verify_checksum")]
    pub verify_checksum: bool,

    /// Timeout for the release metadata request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Timeout for one complete installer download attempt.
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Token for authenticated registry requests (higher rate limits).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,

    /// Where installers are downloaded. Defaults to `{temp}/autologin_updates`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            repository: default_repository(),
            api_base_url: default_api_base_url(),
            check_on_startup: default_check_on_startup(),
            check_interval: 0,
            verify_checksum: default_verify_checksum(),
            request_timeout_secs: default_request_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            github_token: None,
            download_dir: None,
        }
    }
}

fn default_repository() -> String {
    DEFAULT_REPOSITORY.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

const fn default_check_on_startup() -> bool {
    true
}

const fn default_verify_checksum() -> bool {
    true
}

const fn default_request_timeout_secs() -> u64 {
    15
}

const fn default_download_timeout_secs() -> u64 {
    300
}

impl UpgradeConfig {
    /// Parsed repository identifier.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `repository` is not `owner/name`.
    pub fn repository_id(&self) -> Result<RepositoryId> {
        self.repository.parse()
    }

    /// Download directory, falling back to the system temp location.
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir.clone().unwrap_or_else(crate::utils::platform::default_download_dir)
    }

    /// Per-attempt download timeout.
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Interval of the periodic re-check, if enabled.
    pub fn periodic_interval(&self) -> Option<Duration> {
        (self.check_interval > 0).then(|| Duration::from_secs(self.check_interval))
    }

    pub(crate) fn is_default(&self) -> bool {
        *self == Self::default()
    }
}
