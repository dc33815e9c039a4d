//! Individual provisioning strategies.
//!
//! Every strategy is independent and exposes one `attempt` operation, so the
//! order lives entirely in the provisioner's list and each strategy can be
//! tested alone.

use super::layout::{InstalledBrowser, find_installed};
use super::{BrowserBinary, StrategyId};
use crate::constants::PLAYWRIGHT_BROWSERS_PATH_ENV;
use crate::release::Platform;
use crate::utils::platform::{is_executable_file, make_executable};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why a strategy produced no browser.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// There was nothing to try.
    #[error("{0}")]
    Skipped(String),
    /// The strategy ran and failed.
    #[error("{0}")]
    Failed(String),
    /// The run was cancelled.
    #[error("cancelled")]
    Cancelled,
}

/// One way of obtaining the automation browser.
#[async_trait]
pub trait ProvisionStrategy: Send + Sync {
    /// Stable identifier recorded in the attempt history.
    fn id(&self) -> StrategyId;

    /// Try to produce a usable browser.
    async fn attempt(&self, cancel: &CancellationToken) -> Result<BrowserBinary, StrategyError>;
}

fn from_layout(found: InstalledBrowser, method: StrategyId) -> BrowserBinary {
    info!("Using Chromium build {} ({})", found.revision, found.executable.display());
    BrowserBinary {
        executable: found.executable,
        browsers_path: Some(found.browsers_dir),
        method,
    }
}

fn scan(dir: Option<&Path>, platform: Platform, method: StrategyId) -> Result<BrowserBinary, StrategyError> {
    let Some(dir) = dir else {
        return Err(StrategyError::Skipped("browsers directory could not be determined".into()));
    };
    if !dir.is_dir() {
        return Err(StrategyError::Skipped(format!("{} does not exist", dir.display())));
    }
    find_installed(dir, platform)
        .map(|found| from_layout(found, method))
        .ok_or_else(|| StrategyError::Failed(format!("no complete Chromium build in {}", dir.display())))
}

/// Strategy 1: an explicitly configured executable or browsers directory.
#[derive(Debug, Clone)]
pub struct CustomPath {
    path: Option<PathBuf>,
    platform: Platform,
}

impl CustomPath {
    /// Check `path`, if one is configured.
    pub const fn new(path: Option<PathBuf>, platform: Platform) -> Self {
        Self { path, platform }
    }
}

#[async_trait]
impl ProvisionStrategy for CustomPath {
    fn id(&self) -> StrategyId {
        StrategyId::CustomPath
    }

    async fn attempt(&self, _cancel: &CancellationToken) -> Result<BrowserBinary, StrategyError> {
        let Some(path) = &self.path else {
            return Err(StrategyError::Skipped("no custom browser path configured".into()));
        };

        if path.is_file() {
            if !is_executable_file(path) {
                return Err(StrategyError::Failed(format!("{} is not executable", path.display())));
            }
            return Ok(BrowserBinary {
                executable: path.clone(),
                browsers_path: None,
                method: StrategyId::CustomPath,
            });
        }
        if path.is_dir() {
            return scan(Some(path.as_path()), self.platform, StrategyId::CustomPath);
        }
        Err(StrategyError::Failed(format!("{} does not exist", path.display())))
    }
}

/// Strategy 2: a build previously installed into the per-user data directory.
#[derive(Debug, Clone)]
pub struct InstalledBrowsers {
    dir: Option<PathBuf>,
    platform: Platform,
}

impl InstalledBrowsers {
    /// Scan `dir` (normally `{data_dir}/AutoLogin/playwright-browsers`).
    pub const fn new(dir: Option<PathBuf>, platform: Platform) -> Self {
        Self { dir, platform }
    }
}

#[async_trait]
impl ProvisionStrategy for InstalledBrowsers {
    fn id(&self) -> StrategyId {
        StrategyId::InstalledBrowsers
    }

    async fn attempt(&self, _cancel: &CancellationToken) -> Result<BrowserBinary, StrategyError> {
        scan(self.dir.as_deref(), self.platform, StrategyId::InstalledBrowsers)
    }
}

/// Strategy 3: a build shipped inside the application installer.
#[derive(Debug, Clone)]
pub struct PrestagedBrowsers {
    dir: Option<PathBuf>,
    platform: Platform,
}

impl PrestagedBrowsers {
    /// Scan `dir` (normally `{exe_dir}/playwright-browsers`).
    pub const fn new(dir: Option<PathBuf>, platform: Platform) -> Self {
        Self { dir, platform }
    }
}

#[async_trait]
impl ProvisionStrategy for PrestagedBrowsers {
    fn id(&self) -> StrategyId {
        StrategyId::PrestagedBrowsers
    }

    async fn attempt(&self, _cancel: &CancellationToken) -> Result<BrowserBinary, StrategyError> {
        scan(self.dir.as_deref(), self.platform, StrategyId::PrestagedBrowsers)
    }
}

/// Strategy 4: download a build with the Playwright CLI.
#[derive(Debug, Clone)]
pub struct NetworkInstall {
    dir: Option<PathBuf>,
    platform: Platform,
    command: Option<Vec<String>>,
    timeout: Duration,
}

impl NetworkInstall {
    /// Install into `dir` with `command`, or `playwright install chromium` when `None`.
    pub const fn new(dir: Option<PathBuf>, platform: Platform, command: Option<Vec<String>>, timeout: Duration) -> Self {
        Self {
            dir,
            platform,
            command,
            timeout,
        }
    }

    fn resolve_command(&self) -> Result<(OsString, Vec<OsString>), StrategyError> {
        if let Some(command) = &self.command {
            let Some((program, args)) = command.split_first() else {
                return Err(StrategyError::Failed("install_command is empty".into()));
            };
            return Ok((program.into(), args.iter().map(OsString::from).collect()));
        }

        let playwright = which::which("playwright")
            .map_err(|_| StrategyError::Skipped("playwright CLI not found on PATH".into()))?;
        Ok((playwright.into_os_string(), vec!["install".into(), "chromium".into()]))
    }
}

#[async_trait]
impl ProvisionStrategy for NetworkInstall {
    fn id(&self) -> StrategyId {
        StrategyId::NetworkInstall
    }

    async fn attempt(&self, cancel: &CancellationToken) -> Result<BrowserBinary, StrategyError> {
        let Some(dir) = &self.dir else {
            return Err(StrategyError::Skipped("browsers directory could not be determined".into()));
        };
        let (program, args) = self.resolve_command()?;

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| StrategyError::Failed(format!("cannot create {}: {e}", dir.display())))?;

        info!("Installing Chromium into {}", dir.display());
        debug!("Running {:?} {:?}", program, args);

        let mut command = tokio::process::Command::new(&program);
        command
            .args(&args)
            .env(PLAYWRIGHT_BROWSERS_PATH_ENV, dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        command.creation_flags(0x0800_0000); // CREATE_NO_WINDOW

        let child = command
            .spawn()
            .map_err(|e| StrategyError::Failed(format!("cannot run {}: {e}", program.to_string_lossy())))?;

        let output = tokio::select! {
            () = cancel.cancelled() => return Err(StrategyError::Cancelled),
            output = tokio::time::timeout(self.timeout, child.wait_with_output()) => output,
        };
        let output = output
            .map_err(|_| {
                StrategyError::Failed(format!(
                    "install timed out after {}s; check your internet connection",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| StrategyError::Failed(format!("install did not complete: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Browser install failed ({}): {}", output.status, stderr.trim());
            return Err(StrategyError::Failed(format!(
                "install exited with {}: {}",
                output.status,
                last_line(&stderr)
            )));
        }

        let found = find_installed(dir, self.platform).ok_or_else(|| {
            StrategyError::Failed(format!("install finished but no Chromium build is in {}", dir.display()))
        })?;
        if let Err(e) = make_executable(&found.executable) {
            warn!("Could not mark {} executable: {}", found.executable.display(), e);
        }
        Ok(from_layout(found, StrategyId::NetworkInstall))
    }
}

fn last_line(text: &str) -> &str {
    text.lines().rev().map(str::trim).find(|l| !l.is_empty()).unwrap_or("no output")
}
