//! Platform-specific helpers and path resolution
//!
//! Per-user directories follow platform conventions through the `dirs` crate:
//!
//! - **Linux**: `$XDG_DATA_HOME/AutoLogin` or `$HOME/.local/share/AutoLogin`
//! - **macOS**: `$HOME/Library/Application Support/AutoLogin`
//! - **Windows**: `%APPDATA%\AutoLogin`
//!
//! `AUTOLOGIN_DATA_DIR` overrides the data directory, which keeps tests and
//! portable installs away from the real profile.

use crate::constants::{APP_NAME, DOWNLOAD_DIR_NAME};
use crate::core::{Result, UpdateError};
use std::path::{Path, PathBuf};

/// Environment variable overriding the per-user data directory.
pub const DATA_DIR_ENV: &str = "AUTOLOGIN_DATA_DIR";

/// Checks if running on Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

fn platform_help(var: &str) -> String {
    if is_windows() {
        "On Windows: Check that the APPDATA environment variable is set".to_string()
    } else if cfg!(target_os = "macos") {
        "On macOS: Check that the HOME environment variable is set".to_string()
    } else {
        format!("On Linux: Check that the {var} or HOME environment variable is set")
    }
}

/// Returns the per-user application data directory (`{data_dir}/AutoLogin`).
///
/// # Errors
///
/// Returns a configuration error when the platform data directory cannot be
/// determined and `AUTOLOGIN_DATA_DIR` is not set.
pub fn get_data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    dirs::data_dir().map(|p| p.join(APP_NAME)).ok_or_else(|| {
        UpdateError::Config(format!(
            "Could not determine data directory.\n\n{}",
            platform_help("XDG_DATA_HOME")
        ))
    })
}

/// Returns the per-user configuration directory (`{config_dir}/AutoLogin`).
///
/// # Errors
///
/// Returns a configuration error when the platform config directory cannot be determined.
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_NAME)).ok_or_else(|| {
        UpdateError::Config(format!(
            "Could not determine config directory.\n\n{}",
            platform_help("XDG_CONFIG_HOME")
        ))
    })
}

/// Directory that receives installer downloads: `{temp}/autologin_updates`.
#[must_use]
pub fn default_download_dir() -> PathBuf {
    std::env::temp_dir().join(DOWNLOAD_DIR_NAME)
}

/// Directory containing the running executable, if it can be determined.
pub fn executable_dir() -> Option<PathBuf> {
    std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
}

/// Marks a file as executable (`0o755`). No-op on Windows.
///
/// # Errors
///
/// Returns an I/O error if the permissions cannot be read or changed.
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = std::fs::metadata(path)
            .map_err(|e| UpdateError::io(format!("reading permissions of {}", path.display()), e))?
            .permissions();
        permissions.set_mode(0o755);
        std::fs::set_permissions(path, permissions)
            .map_err(|e| UpdateError::io(format!("marking {} executable", path.display()), e))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Whether `path` is a regular file that the current user may execute.
pub fn is_executable_file(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    true
}
