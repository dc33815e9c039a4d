//! Ordered execution of provisioning strategies.

use super::layout::{prestaged_browsers_dir, user_browsers_dir};
use super::strategies::{
    CustomPath, InstalledBrowsers, NetworkInstall, PrestagedBrowsers, ProvisionStrategy, StrategyError,
};
use super::{AttemptOutcome, ProvisionAttempt, ProvisionEvent, ProvisionReport};
use crate::config::BrowserConfig;
use crate::core::{Result, UpdateError};
use crate::release::Platform;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs strategies in order until one yields a browser.
pub struct BrowserProvisioner {
    strategies: Vec<Box<dyn ProvisionStrategy>>,
    events: Option<UnboundedSender<ProvisionEvent>>,
}

impl BrowserProvisioner {
    /// Provisioner over an explicit strategy list.
    pub fn new(strategies: Vec<Box<dyn ProvisionStrategy>>) -> Self {
        Self {
            strategies,
            events: None,
        }
    }

    /// The standard chain for this machine.
    ///
    /// Platforms without an installer format use the Linux browser layout.
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self::for_platform(config, Platform::current().unwrap_or(Platform::Linux))
    }

    /// The standard chain for `platform`.
    pub fn for_platform(config: &BrowserConfig, platform: Platform) -> Self {
        let user_dir = user_browsers_dir()
            .inspect_err(|e| warn!("Per-user browsers directory unavailable: {}", e))
            .ok();

        Self::new(vec![
            Box::new(CustomPath::new(config.custom_executable(), platform)),
            Box::new(InstalledBrowsers::new(user_dir.clone(), platform)),
            Box::new(PrestagedBrowsers::new(prestaged_browsers_dir(), platform)),
            Box::new(NetworkInstall::new(
                user_dir,
                platform,
                config.install_command.clone(),
                config.install_timeout(),
            )),
        ])
    }

    /// Send [`ProvisionEvent`]s to `events` while running.
    #[must_use]
    pub fn with_events(mut self, events: UnboundedSender<ProvisionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event: ProvisionEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is watching.
            let _ = events.send(event);
        }
    }

    /// Make sure a usable browser is present.
    ///
    /// # Errors
    ///
    /// [`UpdateError::BrowserUnavailable`] with every attempt when all
    /// strategies fail, or [`UpdateError::Cancelled`].
    pub async fn ensure_present(&self, cancel: &CancellationToken) -> Result<ProvisionReport> {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            if cancel.is_cancelled() {
                return Err(UpdateError::Cancelled);
            }

            let method = strategy.id();
            debug!("Trying browser strategy {}", method);
            self.emit(ProvisionEvent::Trying(method));

            match strategy.attempt(cancel).await {
                Ok(binary) => {
                    info!("Browser ready via {}: {}", method, binary.executable.display());
                    attempts.push(ProvisionAttempt {
                        method,
                        outcome: AttemptOutcome::Success,
                        detail: binary.executable.display().to_string(),
                    });
                    self.emit(ProvisionEvent::Ready(binary.clone()));
                    return Ok(ProvisionReport { attempts, binary });
                }
                Err(StrategyError::Cancelled) => return Err(UpdateError::Cancelled),
                Err(StrategyError::Skipped(detail)) => {
                    debug!("Browser strategy {} skipped: {}", method, detail);
                    self.record(&mut attempts, method, AttemptOutcome::Skipped, detail);
                }
                Err(StrategyError::Failed(detail)) => {
                    warn!("Browser strategy {} failed: {}", method, detail);
                    self.record(&mut attempts, method, AttemptOutcome::Failed, detail);
                }
            }
        }

        self.emit(ProvisionEvent::Unavailable);
        Err(UpdateError::BrowserUnavailable { attempts })
    }

    fn record(
        &self,
        attempts: &mut Vec<ProvisionAttempt>,
        method: super::StrategyId,
        outcome: AttemptOutcome,
        detail: String,
    ) {
        let attempt = ProvisionAttempt {
            method,
            outcome,
            detail,
        };
        self.emit(ProvisionEvent::Failed(attempt.clone()));
        attempts.push(attempt);
    }
}
