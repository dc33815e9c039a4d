//! Automation browser provisioning.
//!
//! The login automation needs a Chromium build. [`BrowserProvisioner`] tries
//! an ordered list of strategies and stops at the first that yields a usable
//! executable:
//!
//! 1. [`CustomPath`](strategies::CustomPath) - `AUTOLOGIN_BROWSER_PATH` or `[browser] executable_path`
//! 2. [`InstalledBrowsers`](strategies::InstalledBrowsers) - a build in the per-user data directory
//! 3. [`PrestagedBrowsers`](strategies::PrestagedBrowsers) - a build shipped next to the executable
//! 4. [`NetworkInstall`](strategies::NetworkInstall) - `playwright install chromium` into the data directory
//!
//! Each failure is recorded as a [`ProvisionAttempt`] and the next strategy
//! runs. Only when all fail does the run report
//! [`UpdateError::BrowserUnavailable`](crate::core::UpdateError::BrowserUnavailable),
//! which disables the automation feature but nothing else.

pub mod layout;
pub mod provisioner;
pub mod strategies;

pub use provisioner::BrowserProvisioner;
pub use strategies::ProvisionStrategy;

use crate::constants::PLAYWRIGHT_BROWSERS_PATH_ENV;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Identifies a provisioning strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyId {
    /// User-configured executable or browsers directory.
    CustomPath,
    /// Build previously installed into the data directory.
    InstalledBrowsers,
    /// Build pre-staged by the application installer.
    PrestagedBrowsers,
    /// On-demand download.
    NetworkInstall,
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CustomPath => "custom-path",
            Self::InstalledBrowsers => "installed-browsers",
            Self::PrestagedBrowsers => "prestaged-browsers",
            Self::NetworkInstall => "network-install",
        })
    }
}

/// How one strategy fared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The strategy produced a usable browser.
    Success,
    /// Nothing to try (e.g. no custom path configured, no directory).
    Skipped,
    /// The strategy ran and failed.
    Failed,
}

/// One entry of the provisioning history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionAttempt {
    /// Strategy that ran.
    pub method: StrategyId,
    /// Result.
    pub outcome: AttemptOutcome,
    /// What was found or why it failed.
    pub detail: String,
}

impl fmt::Display for ProvisionAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match self.outcome {
            AttemptOutcome::Success => "ok",
            AttemptOutcome::Skipped => "skipped",
            AttemptOutcome::Failed => "failed",
        };
        write!(f, "{} {}: {}", self.method, outcome, self.detail)
    }
}

/// A usable browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowserBinary {
    /// Browser executable.
    pub executable: PathBuf,
    /// Browsers directory Playwright must be pointed at, when the executable
    /// lives in the Playwright layout.
    pub browsers_path: Option<PathBuf>,
    /// Strategy that found it.
    pub method: StrategyId,
}

impl BrowserBinary {
    /// Environment the automation process needs to use this browser.
    ///
    /// The provisioner never changes its own process environment; the caller
    /// applies this to the child it spawns.
    pub fn env(&self) -> Vec<(&'static str, PathBuf)> {
        self.browsers_path
            .iter()
            .map(|path| (PLAYWRIGHT_BROWSERS_PATH_ENV, path.clone()))
            .collect()
    }
}

/// Result of a successful provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    /// Every strategy that ran, in order. The last one succeeded.
    pub attempts: Vec<ProvisionAttempt>,
    /// The browser to use.
    pub binary: BrowserBinary,
}

/// Progress notifications for the status display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionEvent {
    /// A strategy is starting.
    Trying(StrategyId),
    /// A strategy finished without a browser.
    Failed(ProvisionAttempt),
    /// A browser is available.
    Ready(BrowserBinary),
    /// Every strategy failed.
    Unavailable,
}
