//! Progress indicators for downloads and browser provisioning
//!
//! Thin wrappers over `indicatif` with consistent styling. Every indicator is
//! hidden when `AUTOLOGIN_NO_PROGRESS` is set, which keeps CI logs and piped
//! output clean.
//!
//! ```rust,no_run
//! use autologin_updater::utils::progress::ProgressBar;
//!
//! let bar = ProgressBar::download(2_048);
//! bar.set_message("AutoLogin-1.0.16.msi");
//! bar.set_position(1_024);
//! bar.finish_with_message("downloaded");
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

/// Environment variable that disables all progress indicators.
pub const NO_PROGRESS_ENV: &str = "AUTOLOGIN_NO_PROGRESS";

/// Checks if progress indicators should be disabled.
pub fn is_progress_disabled() -> bool {
    std::env::var_os(NO_PROGRESS_ENV).is_some()
}

/// A progress bar with consistent styling.
///
/// Cloning shares the underlying bar, so a clone can be moved into the task
/// that feeds it.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Byte-oriented bar for a download of `total_bytes`.
    ///
    /// A `total_bytes` of zero means the size is unknown and renders as a spinner.
    pub fn download(total_bytes: u64) -> Self {
        if is_progress_disabled() {
            return Self::hidden();
        }
        if total_bytes == 0 {
            return Self::new_spinner();
        }
        let bar = IndicatifBar::new(total_bytes);
        bar.set_style(download_style());
        Self { inner: bar }
    }

    /// Spinner for work of unknown length.
    pub fn new_spinner() -> Self {
        if is_progress_disabled() {
            return Self::hidden();
        }
        let bar = IndicatifBar::new_spinner();
        bar.set_style(spinner_style());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { inner: bar }
    }

    /// A bar that renders nothing.
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Sets the message shown next to the bar.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Moves the bar to an absolute position.
    pub fn set_position(&self, pos: u64) {
        self.inner.set_position(pos);
    }

    /// Updates the expected total, e.g. once a server reports a length.
    pub fn set_length(&self, len: u64) {
        self.inner.set_length(len);
    }

    /// Whether the bar renders nothing.
    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }

    /// Current position.
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Finishes the bar, leaving `msg` on screen.
    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.inner.finish_with_message(msg.into());
    }

    /// Finishes and removes the bar.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn download_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{msg:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .map(|style| style.progress_chars("━╸━"))
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .map(|style| style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]))
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
}
