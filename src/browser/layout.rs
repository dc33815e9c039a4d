//! On-disk layout of Playwright browser builds.
//!
//! A browsers directory holds one directory per build, named
//! `chromium-<revision>`, each containing a platform-specific executable:
//!
//! ```text
//! playwright-browsers/
//! ├── chromium-1140/chrome-linux/chrome
//! └── chromium-1148/chrome-linux/chrome   <- highest revision wins
//! ```

use crate::constants::BROWSERS_DIR_NAME;
use crate::core::Result;
use crate::release::Platform;
use std::path::{Path, PathBuf};
use tracing::debug;

const BUILD_PREFIX: &str = "chromium-";

/// A browser build found in a browsers directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBrowser {
    /// Build revision parsed from the directory name.
    pub revision: u32,
    /// Path of the browser executable.
    pub executable: PathBuf,
    /// Browsers directory the build lives in.
    pub browsers_dir: PathBuf,
}

/// Executable path inside a `chromium-<rev>` directory.
pub fn executable_in_build(platform: Platform) -> PathBuf {
    match platform {
        Platform::Windows => Path::new("chrome-win").join("chrome.exe"),
        Platform::MacOs => Path::new("chrome-mac")
            .join("Chromium.app")
            .join("Contents")
            .join("MacOS")
            .join("Chromium"),
        Platform::Linux => Path::new("chrome-linux").join("chrome"),
    }
}

/// Per-user browsers directory: `{data_dir}/AutoLogin/playwright-browsers`.
///
/// # Errors
///
/// Returns a configuration error when the data directory cannot be determined.
pub fn user_browsers_dir() -> Result<PathBuf> {
    Ok(crate::utils::platform::get_data_dir()?.join(BROWSERS_DIR_NAME))
}

/// Browsers pre-staged by the installer: `{exe_dir}/playwright-browsers`.
pub fn prestaged_browsers_dir() -> Option<PathBuf> {
    crate::utils::platform::executable_dir().map(|dir| dir.join(BROWSERS_DIR_NAME))
}

/// Find the highest-revision complete build in `browsers_dir`.
///
/// Builds whose executable is missing (e.g. an interrupted install) are skipped.
pub fn find_installed(browsers_dir: &Path, platform: Platform) -> Option<InstalledBrowser> {
    let entries = std::fs::read_dir(browsers_dir).ok()?;
    let relative = executable_in_build(platform);

    let mut builds: Vec<(u32, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .filter_map(|entry| {
            let name = entry.file_name();
            let revision = name.to_str()?.strip_prefix(BUILD_PREFIX)?.parse::<u32>().ok()?;
            Some((revision, entry.path()))
        })
        .collect();
    builds.sort_by(|a, b| b.0.cmp(&a.0));

    builds.into_iter().find_map(|(revision, dir)| {
        let executable = dir.join(&relative);
        if executable.is_file() {
            Some(InstalledBrowser {
                revision,
                executable,
                browsers_dir: browsers_dir.to_path_buf(),
            })
        } else {
            debug!("Skipping incomplete build {}", dir.display());
            None
        }
    })
}
