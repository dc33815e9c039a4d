//! Installer handoff.
//!
//! Launching the installer is the last thing the update cycle does. The host
//! is expected to exit right after so the installer can replace its files.
//! Each platform gets one fixed invocation that prefers a silent or
//! minimal-interaction mode:
//!
//! | Platform | Invocation |
//! |----------|------------|
//! | Windows  | `msiexec /i <file> /passive /norestart` |
//! | macOS    | `open <file.dmg>` |
//! | Linux    | mark the AppImage executable, then run it |

use crate::core::{Result, UpdateError};
use crate::release::Platform;
use crate::utils::platform::make_executable;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::info;

/// Starts a downloaded installer.
pub trait InstallerLauncher: Send + Sync {
    /// Start the installer at `installer` without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InstallerLaunch`] if the process cannot be started.
    fn launch(&self, installer: &Path) -> Result<()>;
}

/// Program and arguments that start `installer` on `platform`.
pub fn launch_command(platform: Platform, installer: &Path) -> (OsString, Vec<OsString>) {
    match platform {
        Platform::Windows => (
            OsString::from("msiexec"),
            vec![
                OsString::from("/i"),
                installer.as_os_str().to_os_string(),
                OsString::from("/passive"),
                OsString::from("/norestart"),
            ],
        ),
        Platform::MacOs => (OsString::from("open"), vec![installer.as_os_str().to_os_string()]),
        Platform::Linux => (installer.as_os_str().to_os_string(), Vec::new()),
    }
}

/// Launches installers with the platform's native mechanism.
#[derive(Debug, Clone, Copy)]
pub struct PlatformInstaller {
    platform: Platform,
}

impl PlatformInstaller {
    /// Launcher for `platform`.
    pub const fn new(platform: Platform) -> Self {
        Self { platform }
    }
}

impl InstallerLauncher for PlatformInstaller {
    fn launch(&self, installer: &Path) -> Result<()> {
        let launch_error = |reason: String| UpdateError::InstallerLaunch {
            path: installer.to_path_buf(),
            reason,
        };

        if !installer.is_file() {
            return Err(launch_error("file does not exist".to_string()));
        }

        if self.platform == Platform::Linux {
            make_executable(installer).map_err(|e| launch_error(e.to_string()))?;
        }

        let (program, args) = launch_command(self.platform, installer);
        info!("Launching installer: {:?} {:?}", program, args);

        Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_child| ())
            .map_err(|e| launch_error(format!("{}: {e}", program.to_string_lossy())))
    }
}
