//! Global constants used throughout the updater.
//!
//! Timeouts, retry bounds and naming conventions that are shared by more
//! than one module live here so the numbers stay discoverable.

use std::time::Duration;

/// Application name used for per-user directories and the config file.
pub const APP_NAME: &str = "AutoLogin";

/// Default `owner/repo` pair whose GitHub releases carry the installers.
pub const DEFAULT_REPOSITORY: &str = "TradinxLite/autologin";

/// Default GitHub REST API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Compiled-in version used when no packaging metadata can be read.
///
/// The packaging pipeline keeps `Cargo.toml` in lockstep with the release tag,
/// so the crate version doubles as the fallback literal.
pub const FALLBACK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// File written next to the executable by the packaging pipeline.
pub const BUILD_INFO_FILE: &str = "build-info.json";

/// Timeout for the release metadata request (15 seconds).
pub const RELEASE_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for a complete installer download (5 minutes).
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for an on-demand browser install (10 minutes).
pub const BROWSER_INSTALL_TIMEOUT: Duration = Duration::from_secs(600);

/// Number of retries after the first release request fails transiently.
pub const RELEASE_MAX_RETRIES: usize = 3;

/// Total number of download attempts, each restarting from byte zero.
pub const DOWNLOAD_MAX_ATTEMPTS: usize = 3;

/// Starting delay for exponential backoff (200ms).
///
/// Doubles on each retry attempt.
pub const STARTING_BACKOFF_DELAY_MS: u64 = 200;

/// Maximum backoff delay for exponential backoff (5s).
pub const MAX_BACKOFF_DELAY_MS: u64 = 5_000;

/// Directory name (under the system temp dir) that receives installer downloads.
pub const DOWNLOAD_DIR_NAME: &str = "autologin_updates";

/// Directory name (under the app data dir) holding Playwright browser builds.
pub const BROWSERS_DIR_NAME: &str = "playwright-browsers";

/// Environment variable Playwright reads to locate its browser builds.
pub const PLAYWRIGHT_BROWSERS_PATH_ENV: &str = "PLAYWRIGHT_BROWSERS_PATH";

/// Suffix of the optional per-asset checksum file attached to a release.
pub const CHECKSUM_SUFFIX: &str = ".sha256";
