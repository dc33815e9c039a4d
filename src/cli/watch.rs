//! `watch` command: the long-running host mode.
//!
//! Mirrors what the desktop application does with the controller: one check
//! at startup when `check_on_startup` is set, then a re-check every
//! `check_interval` seconds, printing each state change until interrupted.

use super::CliConfig;
use crate::update::{UpdateController, UpdateState};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

/// `watch` command.
#[derive(Args, Debug)]
pub struct WatchCommand {}

impl WatchCommand {
    /// Run the configured triggers until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Fails when the configuration cannot be loaded or the controller cannot
    /// be built.
    pub async fn execute(&self, config: &CliConfig) -> Result<ExitCode> {
        let global = config.load().await?;
        let controller = UpdateController::from_config(&global.upgrade)?;
        let interval = global.upgrade.periodic_interval();

        if !global.upgrade.check_on_startup && interval.is_none() {
            println!("Nothing to watch: check_on_startup is off and check_interval is 0");
            return Ok(ExitCode::SUCCESS);
        }

        let mut states = controller.subscribe();
        let shutdown = CancellationToken::new();

        if global.upgrade.check_on_startup {
            drop(controller.spawn_check());
        }
        let periodic = interval.map(|every| {
            println!("Re-checking every {}s", every.as_secs());
            controller.spawn_periodic(every, shutdown.clone())
        });

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                changed = states.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = states.borrow_and_update().clone();
                    print_state(&state);
                }
            }
        }

        shutdown.cancel();
        controller.cancel();
        if let Some(periodic) = periodic {
            let _ = periodic.await;
        }
        Ok(ExitCode::SUCCESS)
    }
}

fn print_state(state: &UpdateState) {
    let stamp = chrono::Local::now().format("%H:%M:%S");
    let line = match state {
        UpdateState::UpdateAvailable(info) => {
            format!("update available: {} -> {}", info.current, info.latest).green().to_string()
        }
        UpdateState::Failed(failure) => failure.to_string().red().to_string(),
        other => other.to_string(),
    };
    println!("[{stamp}] {line}");
}
