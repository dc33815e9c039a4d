//! `check` and `upgrade` commands.

use super::{CliConfig, report_failure};
use crate::update::{UpdateController, UpdateInfo, UpdateState};
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use std::process::ExitCode;
use tokio::task::JoinHandle;
use tracing::debug;

/// Exit code after Ctrl-C.
const CANCELLED_EXIT: u8 = 130;

/// `check` command.
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Print the resulting state as JSON.
    #[arg(long)]
    pub json: bool,
}

impl CheckCommand {
    /// Run one update check and report the outcome.
    ///
    /// # Errors
    ///
    /// Fails when the configuration cannot be loaded or the controller cannot
    /// be built.
    pub async fn execute(&self, config: &CliConfig) -> Result<ExitCode> {
        let global = config.load().await?;
        let controller = UpdateController::from_config(&global.upgrade)?;
        let _ctrl_c = cancel_on_ctrl_c(&controller);

        let state = run_check(&controller, config).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&state)?);
            return Ok(exit_code_for(&state));
        }

        match &state {
            UpdateState::NoUpdate { current, .. } => {
                println!("{}", format!("You are on the latest version ({current})").green());
            }
            UpdateState::UpdateAvailable(info) => {
                print_update(info);
                println!("Run `autologin-updater upgrade` to install it");
            }
            UpdateState::Failed(failure) => return Ok(report_failure(failure)),
            UpdateState::Idle => println!("{}", "Update check cancelled".yellow()),
            other => bail!("Unexpected update state after check: {other}"),
        }
        Ok(exit_code_for(&state))
    }
}

/// `upgrade` command.
#[derive(Args, Debug)]
pub struct UpgradeCommand {
    /// Download the installer but do not start it.
    #[arg(long)]
    pub no_launch: bool,
}

impl UpgradeCommand {
    /// Check, download, and launch the installer.
    ///
    /// # Errors
    ///
    /// Fails when the configuration cannot be loaded or the controller cannot
    /// be built.
    pub async fn execute(&self, config: &CliConfig) -> Result<ExitCode> {
        let global = config.load().await?;
        let controller = UpdateController::from_config(&global.upgrade)?;
        let _ctrl_c = cancel_on_ctrl_c(&controller);

        let info = match run_check(&controller, config).await {
            UpdateState::UpdateAvailable(info) => info,
            UpdateState::NoUpdate { current, .. } => {
                println!("{}", format!("Already on the latest version ({current})").green());
                return Ok(ExitCode::SUCCESS);
            }
            UpdateState::Failed(failure) => return Ok(report_failure(&failure)),
            UpdateState::Idle => return Ok(cancelled()),
            other => bail!("Unexpected update state after check: {other}"),
        };
        print_update(&info);

        let path = match run_download(&controller, config, &info).await {
            UpdateState::Downloaded { path, .. } => path,
            UpdateState::Failed(failure) => return Ok(report_failure(&failure)),
            UpdateState::Idle => return Ok(cancelled()),
            other => bail!("Unexpected update state after download: {other}"),
        };
        println!("{} {}", "Downloaded".green(), path.display());

        if self.no_launch {
            println!("Run the installer above to finish upgrading");
            return Ok(ExitCode::SUCCESS);
        }

        match controller.launch() {
            UpdateState::Launching { .. } => {
                println!("{}", "Installer started. Close AutoLogin so it can finish.".green());
                Ok(ExitCode::SUCCESS)
            }
            UpdateState::Failed(failure) => Ok(report_failure(&failure)),
            other => bail!("Unexpected update state after launch: {other}"),
        }
    }
}

async fn run_check(controller: &UpdateController, config: &CliConfig) -> UpdateState {
    let spinner = config.spinner();
    spinner.set_message(format!("Checking {} for updates...", controller.repository()));
    let state = controller.check().await;
    spinner.finish_and_clear();
    state
}

/// Download while a progress bar follows the controller's state channel.
async fn run_download(controller: &UpdateController, config: &CliConfig, info: &UpdateInfo) -> UpdateState {
    let bar = config.download_bar(info.asset.size);
    bar.set_message(info.asset.name.clone());

    let mut states = controller.subscribe();
    let feeder = {
        let bar = bar.clone();
        tokio::spawn(async move {
            while states.changed().await.is_ok() {
                let state = states.borrow_and_update().clone();
                if let UpdateState::Downloading {
                    transferred, total, ..
                } = state
                {
                    if total > 0 {
                        bar.set_length(total);
                    }
                    bar.set_position(transferred);
                }
            }
        })
    };

    let state = controller.download().await;
    feeder.abort();

    match &state {
        UpdateState::Downloaded { .. } => bar.finish_with_message(format!("{} downloaded", info.asset.name)),
        _ => bar.finish_and_clear(),
    }
    state
}

fn print_update(info: &UpdateInfo) {
    println!(
        "{}",
        format!("Update available: {} -> {}", info.current, info.latest).green().bold()
    );
    if let Some(published) = info.published_at {
        println!("Published {}", published.format("%Y-%m-%d"));
    }
    let notes = info.notes.trim();
    if !notes.is_empty() {
        println!("\n{notes}\n");
    }
}

fn cancel_on_ctrl_c(controller: &UpdateController) -> AbortOnDrop {
    let controller = controller.clone();
    AbortOnDrop(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted, cancelling update operation");
            controller.cancel();
        }
    }))
}

struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn cancelled() -> ExitCode {
    eprintln!("{}", "Cancelled".yellow());
    ExitCode::from(CANCELLED_EXIT)
}

fn exit_code_for(state: &UpdateState) -> ExitCode {
    match state {
        UpdateState::Failed(_) => ExitCode::FAILURE,
        UpdateState::Idle => ExitCode::from(CANCELLED_EXIT),
        _ => ExitCode::SUCCESS,
    }
}
