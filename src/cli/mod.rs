//! Command-line host for the updater and the browser provisioner.
//!
//! # Commands
//!
//! - `check` - query the release registry and report whether an update exists
//! - `upgrade` - check, download the installer and hand it to the platform
//! - `browser` - make sure the automation browser is present
//! - `watch` - startup check plus periodic re-checks, printing state changes
//! - `version` - print the running version and where it was resolved from
//!
//! # Global options
//!
//! - `--verbose` / `-v` - debug logging
//! - `--quiet` / `-q` - errors only
//! - `--config` / `-c` - configuration file instead of the default location
//! - `--no-progress` - no progress bars or spinners
//!
//! Failures that the updater records in its state (a failed check or download)
//! are rendered here and turned into a non-zero exit code. Everything else
//! propagates as `anyhow::Error` to `main`.

mod browser;
mod update;
mod watch;

use crate::config::GlobalConfig;
use crate::core::UpdateFailure;
use crate::utils::progress::{ProgressBar, is_progress_disabled};
use crate::version::VersionResolver;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

/// Settings derived from global flags and shared by every command.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive for the tracing subscriber.
    pub log_level: String,
    /// Hide progress indicators.
    pub no_progress: bool,
    /// Explicit configuration file.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Load the configuration file this invocation points at.
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be read or parsed.
    pub async fn load(&self) -> Result<GlobalConfig> {
        GlobalConfig::load_with_optional(self.config_path.clone())
            .await
            .context("Failed to load configuration")
    }

    /// Byte bar for a download, hidden when progress is off.
    pub fn download_bar(&self, total: u64) -> ProgressBar {
        if self.progress_disabled() {
            ProgressBar::hidden()
        } else {
            ProgressBar::download(total)
        }
    }

    /// Spinner for work of unknown length, hidden when progress is off.
    pub fn spinner(&self) -> ProgressBar {
        if self.progress_disabled() {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        }
    }

    fn progress_disabled(&self) -> bool {
        self.no_progress || is_progress_disabled()
    }
}

/// AutoLogin self-updater and browser provisioner.
#[derive(Parser)]
#[command(
    name = "autologin-updater",
    about = "Keep AutoLogin up to date and its automation browser installed",
    version,
    long_about = "Checks GitHub releases for newer AutoLogin builds, downloads the installer for this \
                  platform and hands it off, and provisions the Chromium build used for automated logins."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file.
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Disable progress bars and spinners.
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a newer release is available.
    Check(update::CheckCommand),
    /// Download and launch the installer for the latest release.
    Upgrade(update::UpgradeCommand),
    /// Make sure the automation browser is installed.
    Browser(browser::BrowserCommand),
    /// Check on startup and on the configured interval until interrupted.
    Watch(watch::WatchCommand),
    /// Show the running version.
    Version(VersionCommand),
}

impl Cli {
    /// Settings for this invocation.
    ///
    /// `RUST_LOG` still wins over the level chosen here; see `main`.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress,
            config_path: self.config.clone(),
        }
    }

    /// Run the selected command.
    ///
    /// # Errors
    ///
    /// Returns configuration and I/O errors. Update failures are reported by
    /// the command itself and come back as [`ExitCode::FAILURE`].
    pub async fn execute(self) -> Result<ExitCode> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Run the selected command with explicit settings.
    ///
    /// # Errors
    ///
    /// See [`Cli::execute`].
    pub async fn execute_with_config(self, config: CliConfig) -> Result<ExitCode> {
        match self.command {
            Commands::Check(cmd) => cmd.execute(&config).await,
            Commands::Upgrade(cmd) => cmd.execute(&config).await,
            Commands::Browser(cmd) => cmd.execute(&config).await,
            Commands::Watch(cmd) => cmd.execute(&config).await,
            Commands::Version(cmd) => cmd.execute(),
        }
    }
}

/// `version` command.
#[derive(clap::Args, Debug)]
struct VersionCommand {
    /// Print as JSON.
    #[arg(long)]
    json: bool,
}

impl VersionCommand {
    fn execute(&self) -> Result<ExitCode> {
        let local = VersionResolver::global().current_version();
        if self.json {
            println!("{}", serde_json::to_string_pretty(local)?);
        } else {
            println!("autologin {} ({})", local.version.to_string().bold(), local.provenance);
        }
        Ok(ExitCode::SUCCESS)
    }
}

/// Print a recorded failure with its suggestion and return the failing exit code.
fn report_failure(failure: &UpdateFailure) -> ExitCode {
    eprintln!("{}: {}", "error".red().bold(), failure.detail);
    if let Some(suggestion) = failure.kind.suggestion() {
        eprintln!("{}: {}", "suggestion".green(), suggestion);
    }
    ExitCode::FAILURE
}
