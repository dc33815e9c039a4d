//! `browser` command.

use super::CliConfig;
use crate::browser::{BrowserProvisioner, ProvisionEvent};
use crate::core::{UpdateError, user_friendly_error};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// `browser` command.
#[derive(Args, Debug)]
pub struct BrowserCommand {
    /// Print the provisioning report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl BrowserCommand {
    /// Provision the automation browser and report how it was found.
    ///
    /// # Errors
    ///
    /// Fails when the configuration cannot be loaded.
    pub async fn execute(&self, config: &CliConfig) -> Result<ExitCode> {
        let global = config.load().await?;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let provisioner = BrowserProvisioner::from_config(&global.browser).with_events(tx);

        let spinner = config.spinner();
        let status = {
            let spinner = spinner.clone();
            tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    match event {
                        ProvisionEvent::Trying(method) => spinner.set_message(format!("Trying {method}...")),
                        ProvisionEvent::Failed(attempt) => tracing::debug!("{}", attempt),
                        ProvisionEvent::Ready(_) | ProvisionEvent::Unavailable => break,
                    }
                }
            })
        };

        let cancel = CancellationToken::new();
        let result = tokio::select! {
            result = provisioner.ensure_present(&cancel) => result,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                Err(UpdateError::Cancelled)
            }
        };
        drop(provisioner);
        let _ = status.await;
        spinner.finish_and_clear();

        match result {
            Ok(report) => {
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    return Ok(ExitCode::SUCCESS);
                }
                println!(
                    "{} {} (via {})",
                    "Browser ready:".green(),
                    report.binary.executable.display(),
                    report.binary.method
                );
                for (key, value) in report.binary.env() {
                    println!("  {key}={}", value.display());
                }
                Ok(ExitCode::SUCCESS)
            }
            Err(UpdateError::BrowserUnavailable { attempts }) => {
                for attempt in &attempts {
                    eprintln!("  {} {}", "-".dimmed(), attempt);
                }
                user_friendly_error(UpdateError::BrowserUnavailable { attempts }.into()).display();
                Ok(ExitCode::FAILURE)
            }
            Err(e) => {
                user_friendly_error(e.into()).display();
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
